//! # Time Base
//!
//! The fixed tick grid shared by the parser, the serializer, the transport and
//! the offline renderer.
//!
//! ## Grid
//! - 12 ticks = one quarter beat
//! - Ticks are `f64` because eighth/triplet arithmetic can land on `.5` values
//! - Ticks `[0, COUNT_IN)` are the silent two-beat lead-in; no note or text
//!   may be placed there
//!
//! ## Timing
//! Every tick-to-seconds conversion in the crate goes through [`Tempo`], so the
//! live transport and the offline renderer can never disagree:
//!
//! ```rust
//! use ngoni::timebase::Tempo;
//!
//! let tempo = Tempo::new(120.0, 1.0);
//! assert!((tempo.seconds_per_tick() - 0.5 / 12.0).abs() < 1e-12);
//! assert!((tempo.tick_to_seconds(24.0) - 1.0).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

/// Absolute musical position. 12 ticks = one quarter beat.
pub type Tick = f64;

pub const TICKS_PER_QUARTER: u32 = 12;
pub const TICKS_EIGHTH: u32 = 6;
pub const TICKS_TRIPLET: u32 = 4;
pub const TICKS_SIXTEENTH: u32 = 3;
pub const TICKS_HALF: u32 = 24;
pub const TICKS_WHOLE: u32 = 48;

/// Length of the silent lead-in (two quarter beats).
pub const COUNT_IN: Tick = 24.0;

/// Advance used for delta tokens the parser does not recognize.
pub const DEFAULT_ADVANCE: Tick = TICKS_PER_QUARTER as Tick;

/// Named note durations as written in the first column of a tablature line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duration {
    Quarter,
    Eighth,
    TripletStep,
    Sixteenth,
    Half,
    Whole,
}

impl Duration {
    pub const ALL: [Duration; 6] = [
        Duration::Quarter,
        Duration::Eighth,
        Duration::TripletStep,
        Duration::Sixteenth,
        Duration::Half,
        Duration::Whole,
    ];

    /// Look up a duration by its notation symbol.
    pub fn from_symbol(symbol: &str) -> Option<Duration> {
        Duration::ALL.into_iter().find(|d| d.symbol() == symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Duration::Quarter => "+",
            Duration::Eighth => "♪",
            Duration::TripletStep => "🎶",
            Duration::Sixteenth => "♬",
            Duration::Half => "h",
            Duration::Whole => "w",
        }
    }

    pub fn ticks(self) -> u32 {
        match self {
            Duration::Quarter => TICKS_PER_QUARTER,
            Duration::Eighth => TICKS_EIGHTH,
            Duration::TripletStep => TICKS_TRIPLET,
            Duration::Sixteenth => TICKS_SIXTEENTH,
            Duration::Half => TICKS_HALF,
            Duration::Whole => TICKS_WHOLE,
        }
    }

    /// Dotted length, rounded down: `floor(ticks * 1.5)`.
    pub fn dotted_ticks(self) -> u32 {
        (self.ticks() as f64 * 1.5).floor() as u32
    }
}

/// Metronome feel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RhythmMode {
    /// 4/4
    #[default]
    Binary,
    /// 3/4
    Ternary,
}

impl RhythmMode {
    pub fn beats_per_measure(self) -> i64 {
        match self {
            RhythmMode::Binary => 4,
            RhythmMode::Ternary => 3,
        }
    }

    /// Whether beat number `beat` is the first beat of its measure.
    pub fn is_accent(self, beat: i64) -> bool {
        beat.rem_euclid(self.beats_per_measure()) == 0
    }
}

/// Tempo plus playback speed multiplier.
///
/// `secondsPerTick = (60 / (bpm * speed)) / 12`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: f64,
    pub speed: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            speed: 1.0,
        }
    }
}

impl Tempo {
    pub fn new(bpm: f64, speed: f64) -> Self {
        Self { bpm, speed }
    }

    pub fn effective_bpm(&self) -> f64 {
        self.bpm * self.speed
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.effective_bpm()
    }

    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_beat() / TICKS_PER_QUARTER as f64
    }

    pub fn tick_to_seconds(&self, tick: Tick) -> f64 {
        tick * self.seconds_per_tick()
    }

    pub fn seconds_to_tick(&self, seconds: f64) -> Tick {
        seconds / self.seconds_per_tick()
    }
}

/// Sample frame at which something scheduled for `seconds` must start.
pub fn frame_at(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_symbols() {
        assert_eq!(Duration::from_symbol("+"), Some(Duration::Quarter));
        assert_eq!(Duration::from_symbol("♪"), Some(Duration::Eighth));
        assert_eq!(Duration::from_symbol("🎶"), Some(Duration::TripletStep));
        assert_eq!(Duration::from_symbol("♬"), Some(Duration::Sixteenth));
        assert_eq!(Duration::from_symbol("h"), Some(Duration::Half));
        assert_eq!(Duration::from_symbol("w"), Some(Duration::Whole));
        assert_eq!(Duration::from_symbol("q"), None);
    }

    #[test]
    fn test_dotted_ticks() {
        assert_eq!(Duration::Quarter.dotted_ticks(), 18);
        assert_eq!(Duration::Eighth.dotted_ticks(), 9);
        // 4.5 rounds down
        assert_eq!(Duration::Sixteenth.dotted_ticks(), 4);
        assert_eq!(Duration::TripletStep.dotted_ticks(), 6);
    }

    #[test]
    fn test_seconds_per_tick() {
        let tempo = Tempo::new(120.0, 1.0);
        assert!((tempo.seconds_per_tick() - 0.041_666_666).abs() < 1e-6);
        assert!((tempo.tick_to_seconds(24.0) - 1.0).abs() < 1e-9);

        // Half speed doubles every duration
        let slow = Tempo::new(120.0, 0.5);
        assert!((slow.tick_to_seconds(24.0) - 2.0).abs() < 1e-9);
        assert!((slow.seconds_to_tick(2.0) - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_rhythm_accents() {
        assert!(RhythmMode::Binary.is_accent(0));
        assert!(!RhythmMode::Binary.is_accent(3));
        assert!(RhythmMode::Binary.is_accent(8));
        assert!(RhythmMode::Ternary.is_accent(6));
        assert!(!RhythmMode::Ternary.is_accent(4));
        assert!(RhythmMode::Ternary.is_accent(-3));
    }

    #[test]
    fn test_frame_at() {
        assert_eq!(frame_at(1.0, 44100), 44100);
        assert_eq!(frame_at(0.5, 48000), 24000);
        assert_eq!(frame_at(-0.1, 44100), 0);
    }
}
