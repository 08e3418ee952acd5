//! # Render Module
//!
//! Offline rendering of a whole tablature to an audio buffer, and WAV export.
//!
//! ## Purpose
//! Export needs the complete composition as a fixed buffer, computed as fast
//! as possible rather than in real time. The renderer places every note with
//! the same [`Tempo`] mapping the live transport uses, and mixes through the
//! same [`Mixer`], so an exported file lines up frame for frame with what the
//! transport plays.
//!
//! ## Example
//! ```rust
//! use ngoni::audio::SampleBank;
//! use ngoni::render::render_to_buffer;
//! use ngoni::tablature::parse;
//! use ngoni::timebase::Tempo;
//! use ngoni::tuning::Tuning;
//!
//! let events = parse("24   1D\n12   2G");
//! let tuning = Tuning::base();
//! let bank = SampleBank::new(8000, None);
//! bank.load_for_tuning(&tuning);
//!
//! let buffer = render_to_buffer(&events, &tuning, &bank, Tempo::new(120.0, 1.0), 8000).unwrap();
//! // last note at tick 36 = 1.5 s, plus the 3 s tail
//! assert_eq!(buffer.frames(), 36_000);
//! assert_eq!(buffer.channels, 2);
//! ```

mod export;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::{AudioBuffer, Mixer, Sample, SampleBank, Voice, VoiceId};
use crate::tablature::{Event, EventKind};
use crate::timebase::{frame_at, Tempo};
use crate::tuning::Tuning;

pub use export::{encode_wav, export_wav};

/// Seconds rendered after the last note so its decay is not cut.
pub const RENDER_TAIL: f64 = 3.0;

/// Fixed gain of every rendered note.
pub const RENDER_GAIN: f32 = 0.4;

const CHANNELS: u16 = 2;
const BLOCK_FRAMES: usize = 4096;

/// Render `events` to a stereo buffer at `sample_rate`.
///
/// Returns `None` when there is no note to render. Notes whose string has no
/// pitch, or whose pitch the bank has not loaded, are skipped.
pub fn render_to_buffer(
    events: &[Event],
    tuning: &Tuning,
    bank: &SampleBank,
    tempo: Tempo,
    sample_rate: u32,
) -> Option<AudioBuffer> {
    render_with_tail(events, tuning, bank, tempo, sample_rate, RENDER_TAIL)
}

/// [`render_to_buffer`] with a custom tail length.
pub fn render_with_tail(
    events: &[Event],
    tuning: &Tuning,
    bank: &SampleBank,
    tempo: Tempo,
    sample_rate: u32,
    tail: f64,
) -> Option<AudioBuffer> {
    let last_tick = events
        .iter()
        .filter(|e| e.is_note())
        .map(|e| e.tick)
        .reduce(f64::max)?;

    let duration = tempo.tick_to_seconds(last_tick) + tail.max(0.0);
    let total_frames = (duration * sample_rate as f64).round() as usize;
    let mut mixer = Mixer::new(CHANNELS as usize);
    let mut resampled: HashMap<String, Arc<Sample>> = HashMap::new();

    let mut scheduled = 0;
    for (index, event) in events.iter().enumerate() {
        let EventKind::Note { string, .. } = &event.kind else {
            continue;
        };
        let Some(pitch) = tuning.pitch_of(string) else {
            continue;
        };
        let Some(sample) = sample_at_rate(bank, pitch, sample_rate, &mut resampled) else {
            debug!(pitch, "no sample loaded, note skipped");
            continue;
        };
        let start = frame_at(tempo.tick_to_seconds(event.tick), sample_rate);
        mixer.schedule(
            VoiceId(index as u64),
            Voice::sample(sample, RENDER_GAIN),
            start,
        );
        scheduled += 1;
    }

    let mut buffer = AudioBuffer::silent(sample_rate, CHANNELS, total_frames);
    for block in buffer.samples.chunks_mut(BLOCK_FRAMES * CHANNELS as usize) {
        mixer.process(block);
    }
    info!(
        notes = scheduled,
        seconds = buffer.duration(),
        "offline render complete"
    );
    Some(buffer)
}

fn sample_at_rate(
    bank: &SampleBank,
    pitch: &str,
    sample_rate: u32,
    cache: &mut HashMap<String, Arc<Sample>>,
) -> Option<Arc<Sample>> {
    let sample = bank.get(pitch)?;
    if sample.sample_rate == sample_rate {
        return Some(sample);
    }
    let converted = cache
        .entry(pitch.to_string())
        .or_insert_with(|| Arc::new(sample.as_ref().clone().resampled(sample_rate)));
    Some(Arc::clone(converted))
}
