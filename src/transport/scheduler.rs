//! Lookahead scheduler.
//!
//! Pure state machine: it owns no threads and reads no clock. Every method
//! that depends on time takes the output clock reading `now`, and every pass
//! receives the current [`PlaybackSnapshot`], so edits made between passes
//! are always seen.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::audio::{AudioOutput, Clicks, SampleBank, Voice, VoiceId};
use crate::config::{clamp_bpm, clamp_speed, SchedulerConfig};
use crate::error::NgoniError;
use crate::tablature::{Event, EventKind};
use crate::timebase::{RhythmMode, Tempo, Tick, COUNT_IN, TICKS_PER_QUARTER};
use crate::tuning::Tuning;

const BEAT_TICKS: Tick = TICKS_PER_QUARTER as Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Everything a scheduling pass reads besides the clock. Replaced wholesale
/// by the editing layer.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    /// Sorted by tick.
    pub events: Arc<Vec<Event>>,
    pub tuning: Tuning,
    pub bank: Arc<SampleBank>,
}

impl PlaybackSnapshot {
    pub fn new(events: Vec<Event>, tuning: Tuning, bank: Arc<SampleBank>) -> Self {
        Self {
            events: Arc::new(events),
            tuning,
            bank,
        }
    }

    fn last_note_tick(&self) -> Option<Tick> {
        self.events.iter().rev().find(|e| e.is_note()).map(|e| e.tick)
    }
}

/// Result of one scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Not playing; nothing was done.
    Idle,
    Continue,
    /// Playback reached its end and the scheduler is now stopped.
    Ended,
}

#[derive(Debug)]
pub struct Scheduler {
    state: TransportState,
    tempo: Tempo,
    metronome: bool,
    rhythm_mode: RhythmMode,
    settings: SchedulerConfig,
    clicks: Clicks,
    /// Output time of tick 0.
    anchor: f64,
    /// Cursor while not playing.
    position: Tick,
    /// Everything before this tick has been handed to the output.
    horizon: Tick,
    next_beat: i64,
    pending: Vec<(VoiceId, f64)>,
    /// Set while a pre-rendered buffer is playing: its voice and end time.
    prerendered: Option<(VoiceId, f64)>,
}

impl Scheduler {
    pub fn new(tempo: Tempo, settings: SchedulerConfig, sample_rate: u32) -> Self {
        Self {
            state: TransportState::Stopped,
            tempo,
            metronome: false,
            rhythm_mode: RhythmMode::Binary,
            settings,
            clicks: Clicks::new(sample_rate),
            anchor: 0.0,
            position: COUNT_IN,
            horizon: 0.0,
            next_beat: 0,
            pending: Vec::new(),
            prerendered: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn metronome(&self) -> bool {
        self.metronome
    }

    pub fn rhythm_mode(&self) -> RhythmMode {
        self.rhythm_mode
    }

    pub fn settings(&self) -> &SchedulerConfig {
        &self.settings
    }

    pub fn is_prerendered(&self) -> bool {
        self.prerendered.is_some()
    }

    /// Cursor position. Derived from the anchor while playing, so it never
    /// drifts from the output clock.
    pub fn current_tick(&self, now: f64) -> Tick {
        match self.state {
            TransportState::Playing => (now - self.anchor) / self.tempo.seconds_per_tick(),
            _ => self.position,
        }
    }

    /// Start or resume. From `Stopped` playback starts at tick 0 so the
    /// lead-in is heard; from `Paused` it continues where it stopped.
    pub fn play(&mut self, now: f64, output: &dyn AudioOutput) -> Result<(), NgoniError> {
        let start = match self.state {
            TransportState::Playing => return Ok(()),
            TransportState::Stopped => 0.0,
            TransportState::Paused => self.position,
        };
        self.play_from(now, start, output)
    }

    /// Start playing at `start`, whatever the current state.
    pub fn play_from(
        &mut self,
        now: f64,
        start: Tick,
        output: &dyn AudioOutput,
    ) -> Result<(), NgoniError> {
        if let Err(err) = output.resume() {
            self.stop(output);
            return Err(err);
        }
        self.cancel_pending(output, now);
        self.release_prerendered(output);
        self.state = TransportState::Playing;
        self.anchor_at(now, start.max(0.0));
        debug!(start, bpm = self.tempo.bpm, speed = self.tempo.speed, "transport playing");
        Ok(())
    }

    /// Enter `Playing` for a pre-rendered buffer already handed to the output
    /// as `voice`, sounding from `start_time` for `duration` seconds. The
    /// cursor follows the same clock from tick 0; no events are scheduled.
    /// The voice is stopped on every exit from `Playing`.
    pub fn play_prerendered(
        &mut self,
        voice: VoiceId,
        start_time: f64,
        duration: f64,
        output: &dyn AudioOutput,
    ) {
        self.cancel_pending(output, start_time);
        self.release_prerendered(output);
        self.state = TransportState::Playing;
        self.anchor = start_time;
        self.horizon = 0.0;
        self.next_beat = 0;
        self.prerendered = Some((voice, start_time + duration));
        debug!(duration, "transport playing pre-rendered buffer");
    }

    pub fn pause(&mut self, now: f64, output: &dyn AudioOutput) {
        if self.state != TransportState::Playing {
            return;
        }
        self.position = self.current_tick(now).max(0.0);
        self.cancel_pending(output, now);
        self.release_prerendered(output);
        self.state = TransportState::Paused;
        debug!(tick = self.position, "transport paused");
    }

    /// Stop from any state; the cursor returns to the start of the music.
    pub fn stop(&mut self, output: &dyn AudioOutput) {
        for (id, _) in self.pending.drain(..) {
            output.stop_voice(id);
        }
        self.release_prerendered(output);
        self.state = TransportState::Stopped;
        self.position = COUNT_IN;
        debug!("transport stopped");
    }

    /// Jump to `tick`. While playing the anchor is recomputed so the very next
    /// [`Scheduler::current_tick`] reads `tick` and grows from there.
    pub fn seek(&mut self, now: f64, tick: Tick, output: &dyn AudioOutput) {
        let tick = tick.max(0.0);
        if self.state == TransportState::Playing && self.prerendered.is_none() {
            self.cancel_pending(output, now);
            self.anchor_at(now, tick);
        } else if self.state != TransportState::Playing {
            self.position = tick;
        }
    }

    pub fn set_bpm(&mut self, now: f64, bpm: f64) {
        let tempo = Tempo::new(clamp_bpm(bpm), self.tempo.speed);
        self.retempo(now, tempo);
    }

    pub fn set_speed(&mut self, now: f64, speed: f64) {
        let tempo = Tempo::new(self.tempo.bpm, clamp_speed(speed, self.tempo.speed));
        self.retempo(now, tempo);
    }

    pub fn set_metronome(&mut self, enabled: bool) {
        self.metronome = enabled;
    }

    pub fn set_rhythm_mode(&mut self, mode: RhythmMode) {
        self.rhythm_mode = mode;
    }

    /// One scheduling pass: hand every note and click falling inside the
    /// lookahead window to the output at its exact time.
    pub fn pass(
        &mut self,
        now: f64,
        snapshot: &PlaybackSnapshot,
        output: &dyn AudioOutput,
    ) -> PassOutcome {
        if self.state != TransportState::Playing {
            return PassOutcome::Idle;
        }
        if let Some((_, end)) = self.prerendered {
            if now >= end {
                self.finish(output);
                return PassOutcome::Ended;
            }
            return PassOutcome::Continue;
        }

        let spt = self.tempo.seconds_per_tick();
        let window_end = (now + self.settings.schedule_ahead - self.anchor) / spt;
        let late = now - self.settings.late_tolerance;

        // The list may have been replaced since the last pass, so the next
        // index is always looked up again from the horizon.
        let events = &snapshot.events;
        let first = events.partition_point(|e| e.tick < self.horizon);
        let mut rng = rand::thread_rng();
        for event in events[first..].iter().take_while(|e| e.tick < window_end) {
            let EventKind::Note { string, .. } = &event.kind else {
                continue;
            };
            let at = self.anchor + event.tick * spt;
            if at < late {
                debug!(tick = event.tick, "skipping late note");
                continue;
            }
            let Some(sample) = snapshot
                .tuning
                .pitch_of(string)
                .and_then(|pitch| snapshot.bank.get(pitch))
            else {
                continue;
            };
            let gain = 0.35 + rng.gen::<f32>() * 0.1;
            let id = output.schedule(Voice::sample(sample, gain), at);
            self.pending.push((id, at));
        }

        // The beat clock runs even with the metronome off so that turning it
        // on mid-play lands on the right beat.
        while self.next_beat as f64 * BEAT_TICKS < window_end {
            let at = self.anchor + self.next_beat as f64 * BEAT_TICKS * spt;
            if self.metronome && at >= late {
                let accent = self.rhythm_mode.is_accent(self.next_beat);
                let id = output.schedule(Voice::sample(self.clicks.for_beat(accent), 1.0), at);
                self.pending.push((id, at));
            }
            self.next_beat += 1;
        }

        self.horizon = self.horizon.max(window_end);
        self.pending.retain(|(_, at)| *at > now);

        let ended = match snapshot.last_note_tick() {
            None => true,
            Some(last) => {
                self.horizon > last && now > self.anchor + last * spt + self.settings.end_tail
            }
        };
        if ended {
            self.finish(output);
            return PassOutcome::Ended;
        }
        PassOutcome::Continue
    }

    fn finish(&mut self, output: &dyn AudioOutput) {
        debug!("transport reached the end");
        self.stop(output);
    }

    fn anchor_at(&mut self, now: f64, tick: Tick) {
        self.anchor = now - tick * self.tempo.seconds_per_tick();
        self.horizon = tick;
        self.next_beat = (tick / BEAT_TICKS).ceil() as i64;
    }

    /// Ignored while a pre-rendered buffer plays; its tempo is baked in.
    fn retempo(&mut self, now: f64, tempo: Tempo) {
        if self.prerendered.is_some() {
            return;
        }
        if self.state == TransportState::Playing {
            let tick = self.current_tick(now);
            self.anchor = now - tick * tempo.seconds_per_tick();
        }
        self.tempo = tempo;
    }

    fn release_prerendered(&mut self, output: &dyn AudioOutput) {
        if let Some((voice, _)) = self.prerendered.take() {
            output.stop_voice(voice);
        }
    }

    /// Silence voices that have been scheduled but not started yet.
    fn cancel_pending(&mut self, output: &dyn AudioOutput, now: f64) {
        for (id, at) in self.pending.drain(..) {
            if at > now {
                output.stop_voice(id);
            }
        }
    }
}
