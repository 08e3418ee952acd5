//! # Transport Module
//!
//! Real-time playback of a tablature against the audio output clock.
//!
//! ## Purpose
//! The transport maps output time to ticks and hands every note (and
//! metronome click) to the output ahead of time, stamped with the exact time
//! it must sound. Deciding *what* to schedule happens on a coarse timer; *when*
//! it sounds is left to the output, which is the only sample-accurate clock.
//!
//! ## Timing
//! - `secondsPerTick = (60 / (bpm * speed)) / 12`
//! - `currentTick(now) = (now - T0) / secondsPerTick`, always derived fresh
//!   from the anchor `T0`; seeking to `S` sets `T0 = now - S * secondsPerTick`
//! - every pass schedules `[horizon, now + schedule_ahead)`; notes already
//!   more than `late_tolerance` in the past are dropped
//!
//! ## State Machine
//! ```text
//! Stopped --play--> Playing (from tick 0, lead-in audible)
//! Playing --pause--> Paused --play--> Playing (same tick)
//! any --stop--> Stopped (cursor back to COUNT_IN)
//! Playing --end of music / output failure--> Stopped
//! ```
//!
//! ## Sub-modules
//! - `scheduler` - [`Scheduler`], the pure state machine and scheduling pass
//! - `engine` - [`Transport`], the threaded driver and its notifications
//!
//! ## Related Modules
//! - `render` - offline rendering with the same tick-to-time mapping
//! - `audio` - the [`crate::audio::AudioOutput`] seam

mod engine;
mod scheduler;


pub use engine::{LoopHandle, Transport, TransportEvent, PREVIEW_GAIN};
pub use scheduler::{PassOutcome, PlaybackSnapshot, Scheduler, TransportState};
