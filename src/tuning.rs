//! # Tuning
//!
//! The live mapping from the 12 channels to pitch names.
//!
//! A note event only names a channel (`1D`, `4G`, ...); which pitch it sounds
//! is decided here at playback time, so retuning never touches the tablature.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tablature::StringId;

/// Frequency used for pitch names that cannot be parsed.
pub const FALLBACK_FREQUENCY: f32 = 440.0;

/// A scientific pitch name such as `G#4` or `Bb3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// Semitone within the octave, C = 0
    pub semitone: i8,
    pub octave: i8,
}

impl Pitch {
    /// MIDI note number (C4 = 60).
    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.semitone as i32
    }

    /// Equal-tempered frequency, A4 = 440 Hz.
    pub fn frequency(&self) -> f32 {
        440.0 * 2.0_f32.powf((self.midi() - 69) as f32 / 12.0)
    }
}

impl FromStr for Pitch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars().peekable();
        let base: i8 = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(format!("invalid pitch name: {}", s)),
        };
        let accidental: i8 = match chars.peek() {
            Some('#') => {
                chars.next();
                1
            }
            Some('b') => {
                chars.next();
                -1
            }
            _ => 0,
        };
        let octave: String = chars.collect();
        let octave: i8 = octave
            .parse()
            .map_err(|_| format!("invalid octave in pitch name: {}", s))?;

        // Cb4 is B3, B#3 is C4
        let semitone = base + accidental;
        Ok(Pitch {
            semitone: semitone.rem_euclid(12),
            octave: octave + semitone.div_euclid(12),
        })
    }
}

/// Frequency for a pitch name, falling back to 440 Hz.
pub fn frequency_of(name: &str) -> f32 {
    name.parse::<Pitch>()
        .map(|p| p.frequency())
        .unwrap_or(FALLBACK_FREQUENCY)
}

/// Ordered channel-to-pitch map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuning(BTreeMap<StringId, String>);

impl Tuning {
    /// The fundamental pentatonic tuning.
    pub fn base() -> Self {
        Self::from_notes("E3G3A3C4D4E4G4A4C5D5E5G5")
    }

    /// Build a tuning from concatenated pitch names (`"E3G3A3..."`), assigned
    /// to the channels from lowest (`1D`) to highest (`6G`). Extra names are
    /// ignored; missing ones leave their channels unassigned.
    pub fn from_notes(notes: &str) -> Self {
        let names = split_pitch_names(notes);
        Tuning(StringId::all().zip(names).collect())
    }

    pub fn pitch_of(&self, string: &StringId) -> Option<&str> {
        self.0.get(string).map(String::as_str)
    }

    pub fn set(&mut self, string: StringId, pitch: &str) {
        self.0.insert(string, pitch.to_string());
    }

    /// Distinct pitch names in use, sorted.
    pub fn pitches(&self) -> Vec<String> {
        let mut pitches: Vec<String> = self.0.values().cloned().collect();
        pitches.sort();
        pitches.dedup();
        pitches
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StringId, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for string in StringId::all() {
            if let Some(pitch) = self.pitch_of(&string) {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{}={}", string, pitch)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// `[A-G][#b]?[0-9]*` runs.
fn split_pitch_names(notes: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = notes.chars().peekable();
    while let Some(c) = chars.next() {
        if !('A'..='G').contains(&c) {
            continue;
        }
        let mut name = c.to_string();
        if let Some(&accidental) = chars.peek() {
            if accidental == '#' || accidental == 'b' {
                name.push(accidental);
                chars.next();
            }
        }
        while let Some(&digit) = chars.peek() {
            if !digit.is_ascii_digit() {
                break;
            }
            name.push(digit);
            chars.next();
        }
        names.push(name);
    }
    names
}

/// A named tuning.
#[derive(Debug, Clone)]
pub struct ScalePreset {
    pub name: &'static str,
    notes: &'static str,
}

impl ScalePreset {
    pub fn tuning(&self) -> Tuning {
        Tuning::from_notes(self.notes)
    }

    pub fn find(name: &str) -> Option<&'static ScalePreset> {
        SCALE_PRESETS.iter().find(|p| p.name == name)
    }
}

pub static SCALE_PRESETS: [ScalePreset; 8] = [
    ScalePreset {
        name: "1. Pentatonique Fondamentale",
        notes: "E3G3A3C4D4E4G4A4C5D5E5G5",
    },
    ScalePreset {
        name: "2. Pentatonique (Descente Basse)",
        notes: "F3G3A3C4D4E4G4A4C5D5E5G5",
    },
    ScalePreset {
        name: "3. Manitoumani",
        notes: "F3G3A3C4D4E4G4A4B4C5E5G5",
    },
    ScalePreset {
        name: "4. Orientale Sahara",
        notes: "F3A3B3D4E4F4G#4A4B4C5E5F5",
    },
    ScalePreset {
        name: "5. Fa Blues Augmenté Nyama",
        notes: "F3G#3A#3C4D#4F4G4G#4A#4C5D#5F5",
    },
    ScalePreset {
        name: "6. Fa Ionien",
        notes: "F3A3A#3C4D4E4F4G4A4C5D5F5",
    },
    ScalePreset {
        name: "7. Une Âme",
        notes: "F3G3G#3C4D4D#4F4G#4A#4C5D#5F5",
    },
    ScalePreset {
        name: "8. Impressionniste",
        notes: "E3F3A3B3C4E4G4A4B4C5E5G5",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_parsing() {
        let a4: Pitch = "A4".parse().unwrap();
        assert_eq!(a4.midi(), 69);
        assert!((a4.frequency() - 440.0).abs() < 1e-3);

        let g_sharp: Pitch = "G#4".parse().unwrap();
        assert_eq!(g_sharp.midi(), 68);
        assert!((g_sharp.frequency() - 415.30).abs() < 0.01);

        let b_flat: Pitch = "Bb3".parse().unwrap();
        assert_eq!(b_flat.midi(), 58);

        let e3: Pitch = "E3".parse().unwrap();
        assert!((e3.frequency() - 164.81).abs() < 0.01);
    }

    #[test]
    fn test_enharmonic_octave_wrap() {
        let c_flat: Pitch = "Cb4".parse().unwrap();
        assert_eq!(c_flat.midi(), "B3".parse::<Pitch>().unwrap().midi());
        let b_sharp: Pitch = "B#3".parse().unwrap();
        assert_eq!(b_sharp.midi(), 60);
    }

    #[test]
    fn test_invalid_pitch_falls_back() {
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert_eq!(frequency_of("???"), FALLBACK_FREQUENCY);
    }

    #[test]
    fn test_base_tuning() {
        let tuning = Tuning::base();
        assert_eq!(tuning.len(), 12);
        assert_eq!(tuning.pitch_of(&StringId::new("1D")), Some("E3"));
        assert_eq!(tuning.pitch_of(&StringId::new("1G")), Some("G3"));
        assert_eq!(tuning.pitch_of(&StringId::new("6G")), Some("G5"));
    }

    #[test]
    fn test_from_notes_with_sharps() {
        let tuning = ScalePreset::find("4. Orientale Sahara").unwrap().tuning();
        assert_eq!(tuning.pitch_of(&StringId::new("3D")), Some("E4"));
        assert_eq!(tuning.pitch_of(&StringId::new("4D")), Some("G#4"));
        assert_eq!(tuning.pitch_of(&StringId::new("6G")), Some("F5"));
    }

    #[test]
    fn test_short_note_list_leaves_channels_unassigned() {
        let tuning = Tuning::from_notes("E3G3");
        assert_eq!(tuning.len(), 2);
        assert_eq!(tuning.pitch_of(&StringId::new("2D")), None);
    }

    #[test]
    fn test_retune_and_pitches() {
        let mut tuning = Tuning::base();
        tuning.set(StringId::new("1D"), "G3");
        assert_eq!(tuning.pitch_of(&StringId::new("1D")), Some("G3"));
        let pitches = tuning.pitches();
        // 1D and 1G now share G3
        assert_eq!(pitches.len(), 11);
        assert!(!pitches.contains(&"E3".to_string()));
    }

    #[test]
    fn test_all_presets_are_complete() {
        for preset in &SCALE_PRESETS {
            assert_eq!(preset.tuning().len(), 12, "{}", preset.name);
        }
    }
}
