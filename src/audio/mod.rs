//! # Audio Module
//!
//! Sample storage, mixing and the output seam used by live playback and
//! offline rendering.
//!
//! ## Sub-modules
//! - `buffer` - [`Sample`] (mono one-shot) and [`AudioBuffer`] (interleaved output)
//! - `samples` - [`SampleBank`], pitch-indexed cache with fallback tones
//! - `mixer` - [`Mixer`], sample-accurate voice mixing
//! - `output` - [`AudioOutput`] trait and the explicit-clock [`ManualOutput`]
//! - `click` - metronome click synthesis
//! - `device` - cpal output (feature `device`)
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use ngoni::audio::{AudioOutput, ManualOutput, Sample, Voice};
//!
//! let output = ManualOutput::new(1000);
//! let pluck = Arc::new(Sample::fallback_tone("A4", 440.0, 1000));
//! output.schedule(Voice::sample(pluck, 0.4), 0.5);
//!
//! let rendered = output.advance(1.0);
//! let first = rendered.iter().position(|s| *s != 0.0).unwrap();
//! assert!(first / 2 >= 500);
//! ```

mod buffer;
mod click;
#[cfg(feature = "device")]
mod device;
mod mixer;
mod output;
mod samples;

pub use buffer::{AudioBuffer, Sample};
pub use click::Clicks;
#[cfg(feature = "device")]
pub use device::{DeviceHandle, DeviceOutput};
pub use mixer::{Mixer, Source, Voice, VoiceId};
pub use output::{AudioOutput, ManualOutput, ScheduledVoice};
pub use samples::{read_wav, SampleBank};
