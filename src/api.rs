//! # Public API
//!
//! High-level entry points used by the CLI and by embedding applications.
//!
//! ## Functions
//!
//! - [`normalize()`] - canonical re-serialization of tablature text
//! - [`events_json()`] - parsed events as JSON for external viewers
//! - [`load_composition()`] - open a tablature text file or a project file
//! - [`render_composition()`] - offline render at the composition's tempo
//! - [`export_composition()`] - render and write a WAV file
//!
//! ## Typical Usage
//!
//! ```rust
//! use ngoni::normalize;
//!
//! let text = normalize("+   S\n+   S\n+.   1d   p\n=   2G");
//! assert_eq!(text, "42   1D   P\n=   2G");
//! ```
//!
//! ## Rendering
//!
//! ```rust
//! use ngoni::{render_composition, Composition, Config};
//!
//! let config = Config { sample_rate: 8000, ..Config::default() };
//! let composition = Composition::from_source("24   1D\n12   2G", &config);
//!
//! let buffer = render_composition(&composition, &config).unwrap();
//! // bpm 100: tick 36 = 1.8 s, plus the tail
//! assert_eq!(buffer.frames(), 38_400);
//! # Ok::<(), ngoni::NgoniError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::audio::{AudioBuffer, SampleBank};
use crate::config::{clamp_bpm, Config};
use crate::error::NgoniError;
use crate::project::Project;
use crate::render::{export_wav, render_with_tail};
use crate::tablature::{parse, serialize, Tablature};
use crate::timebase::{RhythmMode, Tempo};
use crate::tuning::Tuning;

/// Parse then re-serialize: the canonical form of `source`.
///
/// # Example
/// ```rust
/// use ngoni::normalize;
///
/// assert_eq!(normalize("24 1D\n♪ 1G"), "24   1D\n6   1G");
/// ```
pub fn normalize(source: &str) -> String {
    serialize(&parse(source))
}

/// Parsed events as pretty-printed JSON.
pub fn events_json(source: &str) -> Result<String, NgoniError> {
    serde_json::to_string_pretty(&parse(source)).map_err(|e| NgoniError::Project(e.to_string()))
}

/// A tablature with everything needed to play it.
#[derive(Debug, Clone)]
pub struct Composition {
    pub title: Option<String>,
    pub tablature: Tablature,
    pub tuning: Tuning,
    pub bpm: f64,
    pub rhythm_mode: RhythmMode,
}

impl Composition {
    /// Bare tablature text with the configured tempo and the base tuning.
    pub fn from_source(source: &str, config: &Config) -> Self {
        Self {
            title: None,
            tablature: Tablature::from_source(source),
            tuning: Tuning::base(),
            bpm: clamp_bpm(config.bpm),
            rhythm_mode: config.rhythm_mode,
        }
    }

    /// Project values win over the configuration.
    pub fn from_project(project: &Project, config: &Config) -> Self {
        Self {
            title: project.title.clone(),
            tablature: project.tablature(),
            tuning: project.resolved_tuning(),
            bpm: clamp_bpm(project.bpm.unwrap_or(config.bpm)),
            rhythm_mode: project.rhythm_mode.unwrap_or(config.rhythm_mode),
        }
    }

    /// Tempo for export and pre-rendering, always at speed 1.0.
    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.bpm, 1.0)
    }

    pub fn to_project(&self) -> Project {
        Project {
            title: self.title.clone(),
            code: Some(self.tablature.source().to_string()),
            tuning: Some(self.tuning.clone()),
            bpm: Some(self.bpm),
            rhythm_mode: Some(self.rhythm_mode),
            ..Project::new("", &self.tablature)
        }
    }
}

fn is_project_file(path: &Path, content: &str) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        || content.trim_start().starts_with('{')
}

/// Open `path` as a project JSON file or as bare tablature text.
pub fn load_composition(path: &Path, config: &Config) -> Result<Composition, NgoniError> {
    let content = std::fs::read_to_string(path).map_err(|e| NgoniError::io(path, e))?;
    if is_project_file(path, &content) {
        let project = Project::from_json(&content)?;
        Ok(Composition::from_project(&project, config))
    } else {
        Ok(Composition::from_source(&content, config))
    }
}

/// A sample bank for `config` with every pitch of `tuning` loaded.
pub fn sample_bank(config: &Config, sample_rate: u32, tuning: &Tuning) -> Arc<SampleBank> {
    let bank = Arc::new(SampleBank::new(sample_rate, config.samples_dir.clone()));
    bank.load_for_tuning(tuning);
    bank
}

/// Render the whole composition offline at `config.sample_rate`.
///
/// Returns `None` when the composition has no notes.
pub fn render_composition(composition: &Composition, config: &Config) -> Option<AudioBuffer> {
    let bank = sample_bank(config, config.sample_rate, &composition.tuning);
    render_with_tail(
        composition.tablature.events(),
        &composition.tuning,
        &bank,
        composition.tempo(),
        config.sample_rate,
        config.render_tail,
    )
}

/// Render and write a WAV file. Returns `false` when there was nothing to
/// render and no file was written.
pub fn export_composition(
    composition: &Composition,
    config: &Config,
    path: &Path,
) -> Result<bool, NgoniError> {
    let Some(buffer) = render_composition(composition, config) else {
        info!("nothing to export");
        return Ok(false);
    };
    export_wav(&buffer, path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_stable() {
        let once = normalize("+   S\n+   S\nh   3d   i\n+   TXT   Fin");
        assert_eq!(once, "48   3D   I\n12   TXT   Fin");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_events_json_shape() {
        let json = events_json("24   1D   P\n12   TXT   Salut").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["kind"], "note");
        assert_eq!(value[0]["stringId"], "1D");
        assert_eq!(value[0]["tick"], 24.0);
        assert_eq!(value[1]["kind"], "text");
        assert_eq!(value[1]["message"], "Salut");
    }

    #[test]
    fn test_project_overrides_config() {
        let config = Config::default();
        let project = Project {
            bpm: Some(500.0),
            rhythm_mode: Some(RhythmMode::Ternary),
            ..Project::default()
        };
        let composition = Composition::from_project(&project, &config);
        assert_eq!(composition.bpm, 240.0);
        assert_eq!(composition.rhythm_mode, RhythmMode::Ternary);
        assert_eq!(composition.tuning, Tuning::base());
    }

    #[test]
    fn test_export_tempo_ignores_speed() {
        let config = Config {
            speed: 0.5,
            ..Config::default()
        };
        let composition = Composition::from_source("24   1D", &config);
        assert_eq!(composition.tempo(), Tempo::new(100.0, 1.0));
    }

    #[test]
    fn test_composition_to_project() {
        let composition = Composition::from_source("24   1D", &Config::default());
        let project = composition.to_project();
        assert_eq!(project.code.as_deref(), Some("24   1D"));
        assert_eq!(project.bpm, Some(100.0));
        assert_eq!(project.version.as_deref(), Some(crate::project::PROJECT_VERSION));
        let back = Composition::from_project(&project, &Config::default());
        assert_eq!(back.tablature.source(), "24   1D");
    }

    #[test]
    fn test_empty_composition_exports_nothing() {
        let config = Config {
            sample_rate: 8000,
            ..Config::default()
        };
        let composition = Composition::from_source("+   S\n+   S", &config);
        let path = std::env::temp_dir().join(format!("ngoni-empty-{}.wav", std::process::id()));
        assert!(!export_composition(&composition, &config, &path).unwrap());
        assert!(!path.exists());
    }
}
