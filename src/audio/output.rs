//! The audio output seam.
//!
//! The transport only needs a clock and a way to start sounds at a given time.
//! [`AudioOutput`] captures that; the live device and the test output both
//! implement it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::mixer::{Mixer, Voice, VoiceId};
use crate::error::NgoniError;
use crate::timebase::frame_at;

pub trait AudioOutput: Send + Sync {
    fn sample_rate(&self) -> u32;

    /// Output clock in seconds. Monotonic.
    fn current_time(&self) -> f64;

    /// Make sure the output is running. Fails when the device is unavailable
    /// or the stream refused to start.
    fn resume(&self) -> Result<(), NgoniError>;

    /// Start `voice` at output time `at` (seconds).
    fn schedule(&self, voice: Voice, at: f64) -> VoiceId;

    fn stop_voice(&self, id: VoiceId);
}

/// A voice as recorded by [`ManualOutput`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVoice {
    pub id: VoiceId,
    pub at: f64,
    pub label: String,
    pub gain: f32,
}

#[derive(Debug)]
struct ManualState {
    mixer: Mixer,
    scheduled: Vec<ScheduledVoice>,
    resume_error: Option<String>,
}

/// An output driven by an explicit clock.
///
/// Time only moves when [`ManualOutput::advance`] is called, which also
/// renders the elapsed frames through a real [`Mixer`]. Every scheduled voice
/// is recorded so callers can check what would have sounded and when.
#[derive(Debug)]
pub struct ManualOutput {
    sample_rate: u32,
    next_id: AtomicU64,
    state: Mutex<ManualState>,
}

impl ManualOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            next_id: AtomicU64::new(1),
            state: Mutex::new(ManualState {
                mixer: Mixer::new(2),
                scheduled: Vec::new(),
                resume_error: None,
            }),
        }
    }

    /// Make the next `resume` fail with `reason`.
    pub fn fail_resume(&self, reason: &str) {
        self.lock().resume_error = Some(reason.to_string());
    }

    /// Move the clock forward, returning the interleaved stereo frames
    /// rendered in that span.
    pub fn advance(&self, seconds: f64) -> Vec<f32> {
        let mut state = self.lock();
        let now = state.mixer.frame();
        let target = frame_at(now as f64 / self.sample_rate as f64 + seconds, self.sample_rate);
        let frames = target.saturating_sub(now) as usize;
        let mut out = vec![0.0; frames * state.mixer.channels()];
        state.mixer.process(&mut out);
        out
    }

    /// Every voice scheduled so far, stopped ones included.
    pub fn scheduled(&self) -> Vec<ScheduledVoice> {
        self.lock().scheduled.clone()
    }

    pub fn clear_scheduled(&self) {
        self.lock().scheduled.clear();
    }

    pub fn active_voices(&self) -> usize {
        self.lock().mixer.active_voices()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioOutput for ManualOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.lock().mixer.frame() as f64 / self.sample_rate as f64
    }

    fn resume(&self) -> Result<(), NgoniError> {
        match self.lock().resume_error.take() {
            Some(reason) => Err(NgoniError::AudioUnavailable(reason)),
            None => Ok(()),
        }
    }

    fn schedule(&self, voice: Voice, at: f64) -> VoiceId {
        let id = VoiceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.lock();
        state.scheduled.push(ScheduledVoice {
            id,
            at,
            label: voice.source.label().to_string(),
            gain: voice.gain,
        });
        state.mixer.schedule(id, voice, frame_at(at, self.sample_rate));
        id
    }

    fn stop_voice(&self, id: VoiceId) {
        self.lock().mixer.stop(id);
    }
}
