//! # Project Files
//!
//! The JSON document a composition is saved as: the tablature source plus the
//! tuning and tempo it was written for.
//!
//! ```json
//! {
//!   "title": "Kelefa",
//!   "version": "1.0",
//!   "code": "+   S\n+   S\n+   1D",
//!   "tuning": { "1D": "E3", "1G": "G3" },
//!   "scaleName": "1. Pentatonique Fondamentale",
//!   "bpm": 100,
//!   "rhythmMode": "binary"
//! }
//! ```
//!
//! Every field is optional on load; whatever is absent falls back to the
//! editor defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::NgoniError;
use crate::tablature::Tablature;
use crate::timebase::RhythmMode;
use crate::tuning::{ScalePreset, Tuning};

pub const PROJECT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<Tuning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhythm_mode: Option<RhythmMode>,
}

impl Project {
    /// A project for `tablature` with the current version stamp.
    pub fn new(title: &str, tablature: &Tablature) -> Self {
        Self {
            title: Some(title.to_string()),
            version: Some(PROJECT_VERSION.to_string()),
            code: Some(tablature.source().to_string()),
            ..Self::default()
        }
    }

    pub fn from_json(content: &str) -> Result<Self, NgoniError> {
        serde_json::from_str(content).map_err(|e| NgoniError::Project(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, NgoniError> {
        serde_json::to_string_pretty(self).map_err(|e| NgoniError::Project(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, NgoniError> {
        let content = std::fs::read_to_string(path).map_err(|e| NgoniError::io(path, e))?;
        let project = Self::from_json(&content)?;
        info!(path = %path.display(), title = ?project.title, "project loaded");
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<(), NgoniError> {
        std::fs::write(path, self.to_json()?).map_err(|e| NgoniError::io(path, e))
    }

    /// The tablature held in `code`. A project without code opens empty.
    pub fn tablature(&self) -> Tablature {
        match &self.code {
            Some(code) => Tablature::from_source(code),
            None => Tablature::new(),
        }
    }

    /// The explicit tuning, else the named scale, else the base tuning.
    pub fn resolved_tuning(&self) -> Tuning {
        if let Some(tuning) = &self.tuning {
            return tuning.clone();
        }
        self.scale_name
            .as_deref()
            .and_then(ScalePreset::find)
            .map(ScalePreset::tuning)
            .unwrap_or_else(Tuning::base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tablature::StringId;

    #[test]
    fn test_empty_object_loads() {
        let project = Project::from_json("{}").unwrap();
        assert_eq!(project, Project::default());
        assert_eq!(project.tablature().source(), crate::tablature::LEAD_IN_HEADER);
        assert_eq!(project.resolved_tuning(), Tuning::base());
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r#"{
            "title": "Kelefa",
            "version": "1.0",
            "timestamp": "2024-05-01T10:00:00.000Z",
            "code": "+   S\n+   S\n+   1D\n=   2G   I",
            "tuning": {"1D": "F3", "2G": "C4"},
            "scaleName": "3. Manitoumani",
            "bpm": 84,
            "rhythmMode": "ternary"
        }"#;
        let project = Project::from_json(json).unwrap();
        assert_eq!(project.title.as_deref(), Some("Kelefa"));
        assert_eq!(project.bpm, Some(84.0));
        assert_eq!(project.rhythm_mode, Some(RhythmMode::Ternary));
        assert_eq!(project.scale_name.as_deref(), Some("3. Manitoumani"));
        assert_eq!(project.tablature().events().len(), 2);

        let tuning = project.resolved_tuning();
        assert_eq!(tuning.pitch_of(&StringId::new("1D")), Some("F3"));
        assert_eq!(tuning.len(), 2);
    }

    #[test]
    fn test_scale_name_used_without_tuning() {
        let project = Project {
            scale_name: Some("4. Orientale Sahara".to_string()),
            ..Project::default()
        };
        assert_eq!(
            project.resolved_tuning().pitch_of(&StringId::new("4D")),
            Some("G#4")
        );
    }

    #[test]
    fn test_code_survives_save_and_load() {
        let mut tablature = Tablature::new();
        tablature.insert_note(StringId::new("3D"), None, 24.0);
        tablature.insert_text("Refrain", 36.0);
        let project = Project::new("Essai", &tablature);

        let reloaded = Project::from_json(&project.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, project);
        assert_eq!(reloaded.tablature().source(), tablature.source());
        assert_eq!(reloaded.version.as_deref(), Some(PROJECT_VERSION));
    }

    #[test]
    fn test_malformed_json_is_project_error() {
        assert!(matches!(
            Project::from_json("{ not json"),
            Err(NgoniError::Project(_))
        ));
        assert!(matches!(
            Project::from_json(r#"{"bpm": "fast"}"#),
            Err(NgoniError::Project(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("ngoni-project-{}.json", std::process::id()));
        let project = Project {
            title: Some("Fichier".to_string()),
            bpm: Some(110.0),
            ..Project::default()
        };
        project.save(&path).unwrap();
        assert_eq!(Project::load(&path).unwrap(), project);
        std::fs::remove_file(path).ok();
    }
}
