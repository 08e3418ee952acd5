//! Threaded transport driving the [`Scheduler`].
//!
//! Two loops run while playing: the scheduling loop (one pass every
//! `interval_ms`) and the cursor loop (a `Tick` notification every
//! `cursor_interval_ms`, read from the output clock). Both loops are
//! separate handles released on every exit from `Playing`. The pre-rendered
//! voice, if any, belongs to the [`Scheduler`], so a failure seen on the loop
//! thread silences it too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::scheduler::{PassOutcome, PlaybackSnapshot, Scheduler, TransportState};
use crate::audio::{AudioBuffer, AudioOutput, SampleBank, Voice};
use crate::config::Config;
use crate::error::NgoniError;
use crate::tablature::{Event, StringId};
use crate::timebase::{RhythmMode, Tempo, Tick};
use crate::tuning::Tuning;

/// Gain of a string preview.
pub const PREVIEW_GAIN: f32 = 0.4;

/// Notifications published to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Cursor position from the output clock.
    Tick(Tick),
    /// Playback reached its end and stopped by itself.
    Ended,
    /// The output failed; playback is stopped.
    Failed(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A cancellable periodic thread.
pub struct LoopHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LoopHandle {
    /// Run `step` every `period` until it returns `false` or the handle is
    /// cancelled.
    pub fn spawn(period: Duration, mut step: impl FnMut() -> bool + Send + 'static) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                if !step() {
                    flag.store(false, Ordering::Release);
                    break;
                }
                thread::sleep(period);
            }
        });
        Self {
            running,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for its thread to exit.
    pub fn cancel(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("transport loop thread panicked");
            }
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Real-time playback of a tablature.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use ngoni::audio::{ManualOutput, SampleBank};
/// use ngoni::config::Config;
/// use ngoni::tablature::parse;
/// use ngoni::transport::Transport;
///
/// let output = Arc::new(ManualOutput::new(8000));
/// let bank = Arc::new(SampleBank::new(8000, None));
/// let mut transport = Transport::manual(output.clone(), bank, &Config::default());
/// transport.set_events(parse("+   S\n+   S\n+   1D"));
///
/// // bpm 100: the note at tick 36 sounds at 1.8 s
/// transport.play().unwrap();
/// transport.pump();
/// assert!(output.scheduled().is_empty());
///
/// output.advance(1.6);
/// transport.pump();
/// assert_eq!(output.scheduled().len(), 1);
/// assert!((output.scheduled()[0].at - 1.8).abs() < 1e-9);
/// ```
pub struct Transport {
    output: Arc<dyn AudioOutput>,
    scheduler: Arc<Mutex<Scheduler>>,
    snapshot: Arc<Mutex<PlaybackSnapshot>>,
    sender: Sender<TransportEvent>,
    receiver: Receiver<TransportEvent>,
    threaded: bool,
    schedule_loop: Option<LoopHandle>,
    cursor_loop: Option<LoopHandle>,
}

impl Transport {
    /// A transport whose loops run on their own threads.
    pub fn new(output: Arc<dyn AudioOutput>, bank: Arc<SampleBank>, config: &Config) -> Self {
        Self::build(output, bank, config, true)
    }

    /// A transport that only advances when [`Transport::pump`] is called.
    pub fn manual(output: Arc<dyn AudioOutput>, bank: Arc<SampleBank>, config: &Config) -> Self {
        Self::build(output, bank, config, false)
    }

    fn build(
        output: Arc<dyn AudioOutput>,
        bank: Arc<SampleBank>,
        config: &Config,
        threaded: bool,
    ) -> Self {
        let mut scheduler = Scheduler::new(
            config.tempo(),
            config.scheduler.clone(),
            output.sample_rate(),
        );
        scheduler.set_metronome(config.metronome);
        scheduler.set_rhythm_mode(config.rhythm_mode);
        let (sender, receiver) = channel();
        Self {
            output,
            scheduler: Arc::new(Mutex::new(scheduler)),
            snapshot: Arc::new(Mutex::new(PlaybackSnapshot::new(
                Vec::new(),
                Tuning::base(),
                bank,
            ))),
            sender,
            receiver,
            threaded,
            schedule_loop: None,
            cursor_loop: None,
        }
    }

    /// Replace the event list. Takes effect on the next scheduling pass.
    pub fn set_events(&mut self, mut events: Vec<Event>) {
        events.sort_by(|a, b| a.tick.total_cmp(&b.tick));
        lock(&self.snapshot).events = Arc::new(events);
    }

    /// Replace the tuning. Samples for any new pitch are loaded before the
    /// next scheduling pass can see it.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        let bank = Arc::clone(&lock(&self.snapshot).bank);
        bank.load_for_tuning(&tuning);
        lock(&self.snapshot).tuning = tuning;
    }

    pub fn tuning(&self) -> Tuning {
        lock(&self.snapshot).tuning.clone()
    }

    pub fn events(&self) -> Arc<Vec<Event>> {
        Arc::clone(&lock(&self.snapshot).events)
    }

    pub fn state(&self) -> TransportState {
        lock(&self.scheduler).state()
    }

    pub fn tempo(&self) -> Tempo {
        lock(&self.scheduler).tempo()
    }

    pub fn current_tick(&self) -> Tick {
        let now = self.output.current_time();
        lock(&self.scheduler).current_tick(now)
    }

    /// Start or resume playback. Samples for the current tuning are loaded
    /// first; playback never starts with a pitch unresolved.
    pub fn play(&mut self) -> Result<(), NgoniError> {
        if self.state() == TransportState::Playing {
            return Ok(());
        }
        self.start(None)
    }

    /// Start playback at `tick`, whatever the current state.
    pub fn play_from(&mut self, tick: Tick) -> Result<(), NgoniError> {
        self.start(Some(tick))
    }

    fn start(&mut self, from: Option<Tick>) -> Result<(), NgoniError> {
        self.release_handles();
        self.load_samples();

        let now = self.output.current_time();
        let result = {
            let mut scheduler = lock(&self.scheduler);
            match from {
                Some(tick) => scheduler.play_from(now, tick, &*self.output),
                None => scheduler.play(now, &*self.output),
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "playback failed to start");
            let _ = self.sender.send(TransportEvent::Failed(err.to_string()));
            return Err(err);
        }
        self.start_loops();
        Ok(())
    }

    /// Play an offline-rendered buffer through the live output. The cursor
    /// follows the output clock from tick 0 at the current tempo, so render
    /// the buffer with that tempo.
    pub fn play_prerendered(&mut self, buffer: AudioBuffer) -> Result<(), NgoniError> {
        self.stop();
        if buffer.sample_rate != self.output.sample_rate() {
            let err = NgoniError::AudioUnavailable(format!(
                "buffer rate {} Hz does not match output rate {} Hz",
                buffer.sample_rate,
                self.output.sample_rate()
            ));
            let _ = self.sender.send(TransportEvent::Failed(err.to_string()));
            return Err(err);
        }
        if let Err(err) = self.output.resume() {
            let _ = self.sender.send(TransportEvent::Failed(err.to_string()));
            return Err(err);
        }

        let start = self.output.current_time();
        let duration = buffer.duration();
        let voice = self.output.schedule(Voice::buffer(Arc::new(buffer)), start);
        lock(&self.scheduler).play_prerendered(voice, start, duration, &*self.output);
        self.start_loops();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.release_handles();
        let now = self.output.current_time();
        lock(&self.scheduler).pause(now, &*self.output);
    }

    pub fn stop(&mut self) {
        self.release_handles();
        lock(&self.scheduler).stop(&*self.output);
    }

    pub fn seek(&mut self, tick: Tick) {
        let now = self.output.current_time();
        lock(&self.scheduler).seek(now, tick, &*self.output);
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        let now = self.output.current_time();
        lock(&self.scheduler).set_bpm(now, bpm);
    }

    pub fn set_speed(&mut self, speed: f64) {
        let now = self.output.current_time();
        lock(&self.scheduler).set_speed(now, speed);
    }

    pub fn set_metronome(&mut self, enabled: bool) {
        lock(&self.scheduler).set_metronome(enabled);
    }

    pub fn set_rhythm_mode(&mut self, mode: RhythmMode) {
        lock(&self.scheduler).set_rhythm_mode(mode);
    }

    /// Sound one string right away. Returns `false` when the string has no
    /// pitch in the current tuning.
    pub fn preview_string(&mut self, string: &StringId) -> Result<bool, NgoniError> {
        let snapshot = lock(&self.snapshot).clone();
        let Some(pitch) = snapshot.tuning.pitch_of(string) else {
            return Ok(false);
        };
        snapshot.bank.load_for_tuning(&snapshot.tuning);
        let Some(sample) = snapshot.bank.get(pitch) else {
            return Ok(false);
        };
        self.output.resume()?;
        let now = self.output.current_time();
        self.output.schedule(Voice::sample(sample, PREVIEW_GAIN), now);
        Ok(true)
    }

    /// Drain pending notifications.
    pub fn poll_events(&self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Run one scheduling pass and one cursor update on the calling thread.
    pub fn pump(&mut self) -> PassOutcome {
        let outcome = scheduling_pass(&self.scheduler, &self.snapshot, &*self.output, &self.sender);
        cursor_update(&self.scheduler, &*self.output, &self.sender);
        if outcome != PassOutcome::Continue {
            self.release_handles();
        }
        outcome
    }

    fn load_samples(&self) {
        let snapshot = lock(&self.snapshot).clone();
        snapshot.bank.load_for_tuning(&snapshot.tuning);
    }

    fn start_loops(&mut self) {
        if !self.threaded {
            return;
        }
        let settings = lock(&self.scheduler).settings().clone();

        let (scheduler, snapshot, output, sender) = (
            Arc::clone(&self.scheduler),
            Arc::clone(&self.snapshot),
            Arc::clone(&self.output),
            self.sender.clone(),
        );
        self.schedule_loop = Some(LoopHandle::spawn(settings.interval(), move || {
            scheduling_pass(&scheduler, &snapshot, &*output, &sender) == PassOutcome::Continue
        }));

        let (scheduler, output, sender) = (
            Arc::clone(&self.scheduler),
            Arc::clone(&self.output),
            self.sender.clone(),
        );
        self.cursor_loop = Some(LoopHandle::spawn(settings.cursor_interval(), move || {
            cursor_update(&scheduler, &*output, &sender)
        }));
        debug!("transport loops started");
    }

    fn release_handles(&mut self) {
        if let Some(handle) = self.schedule_loop.take() {
            handle.cancel();
        }
        if let Some(handle) = self.cursor_loop.take() {
            handle.cancel();
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.release_handles();
        lock(&self.scheduler).stop(&*self.output);
    }
}

fn scheduling_pass(
    scheduler: &Mutex<Scheduler>,
    snapshot: &Mutex<PlaybackSnapshot>,
    output: &dyn AudioOutput,
    sender: &Sender<TransportEvent>,
) -> PassOutcome {
    if let Err(err) = output.resume() {
        let mut scheduler = lock(scheduler);
        if scheduler.state() != TransportState::Playing {
            return PassOutcome::Idle;
        }
        warn!(error = %err, "audio output failed during playback");
        scheduler.stop(output);
        let _ = sender.send(TransportEvent::Failed(err.to_string()));
        return PassOutcome::Idle;
    }
    let snapshot = lock(snapshot).clone();
    let now = output.current_time();
    let outcome = lock(scheduler).pass(now, &snapshot, output);
    if outcome == PassOutcome::Ended {
        let _ = sender.send(TransportEvent::Ended);
    }
    outcome
}

/// Publish the cursor; `false` once playback is over.
fn cursor_update(
    scheduler: &Mutex<Scheduler>,
    output: &dyn AudioOutput,
    sender: &Sender<TransportEvent>,
) -> bool {
    let scheduler = lock(scheduler);
    if scheduler.state() != TransportState::Playing {
        return false;
    }
    let tick = scheduler.current_tick(output.current_time());
    drop(scheduler);
    let _ = sender.send(TransportEvent::Tick(tick));
    true
}
