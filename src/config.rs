//! # Configuration
//!
//! Playback and rendering settings, stored as YAML.
//!
//! Every field has a default, so a partial file (or no file at all) is valid.
//!
//! ## Example
//! ```rust
//! use ngoni::config::Config;
//!
//! let config = Config::from_yaml("bpm: 90\nscheduler:\n  schedule_ahead: 0.2\n").unwrap();
//! assert_eq!(config.bpm, 90.0);
//! assert_eq!(config.scheduler.schedule_ahead, 0.2);
//! assert_eq!(config.scheduler.interval_ms, 100);
//! assert_eq!(config.sample_rate, 44100);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NgoniError;
use crate::timebase::{RhythmMode, Tempo};

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 240.0;
pub const MAX_SPEED: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bpm: f64,
    pub speed: f64,
    pub metronome: bool,
    pub rhythm_mode: RhythmMode,
    /// Directory of `<PITCH>.wav` files. Without it every pitch is synthesized.
    pub samples_dir: Option<PathBuf>,
    /// Offline render rate.
    pub sample_rate: u32,
    pub scheduler: SchedulerConfig,
    /// Seconds of silence appended after the last note of an offline render.
    pub render_tail: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: 100.0,
            speed: 1.0,
            metronome: false,
            rhythm_mode: RhythmMode::Binary,
            samples_dir: None,
            sample_rate: 44100,
            scheduler: SchedulerConfig::default(),
            render_tail: 3.0,
        }
    }
}

/// Timing of the live scheduling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall time between scheduling passes.
    pub interval_ms: u64,
    /// How far ahead of the output clock each pass schedules, in seconds.
    pub schedule_ahead: f64,
    /// Events older than this when first seen are dropped, in seconds.
    pub late_tolerance: f64,
    /// Seconds after the last note before playback ends.
    pub end_tail: f64,
    /// Wall time between cursor updates.
    pub cursor_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            schedule_ahead: 0.4,
            late_tolerance: 0.05,
            end_tail: 0.5,
            cursor_interval_ms: 16,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn cursor_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_interval_ms.max(1))
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, NgoniError> {
        serde_yaml::from_str(content).map_err(|e| NgoniError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, NgoniError> {
        serde_yaml::to_string(self).map_err(|e| NgoniError::Config(e.to_string()))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, NgoniError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(NgoniError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), NgoniError> {
        std::fs::write(path, self.to_yaml()?).map_err(|e| NgoniError::io(path, e))
    }

    /// The configured tempo, clamped to the playable range.
    pub fn tempo(&self) -> Tempo {
        Tempo::new(clamp_bpm(self.bpm), clamp_speed(self.speed, 1.0))
    }
}

pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return Config::default().bpm;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Speed must stay in `(0, MAX_SPEED]`; anything not strictly positive keeps
/// `current`.
pub fn clamp_speed(speed: f64, current: f64) -> f64 {
    if speed > 0.0 {
        speed.min(MAX_SPEED)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_rhythm_mode_is_lowercase() {
        let config = Config::from_yaml("rhythm_mode: ternary\nmetronome: true").unwrap();
        assert_eq!(config.rhythm_mode, RhythmMode::Ternary);
        assert!(config.metronome);
        assert!(Config::from_yaml("rhythm_mode: waltz").is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config {
            bpm: 84.0,
            samples_dir: Some(PathBuf::from("/tmp/ngoni")),
            ..Config::default()
        };
        assert_eq!(Config::from_yaml(&config.to_yaml().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/ngoni.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_tempo_is_clamped() {
        let config = Config {
            bpm: 400.0,
            speed: -1.0,
            ..Config::default()
        };
        let tempo = config.tempo();
        assert_eq!(tempo.bpm, MAX_BPM);
        assert_eq!(tempo.speed, 1.0);
        assert_eq!(clamp_bpm(10.0), MIN_BPM);
        assert_eq!(clamp_speed(9.0, 1.0), MAX_SPEED);
        assert_eq!(clamp_speed(0.0, 0.5), 0.5);
    }
}
