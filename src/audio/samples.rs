//! Pitch-indexed sample cache.
//!
//! Samples live in a directory as `<PITCH>.wav` (`G#4.wav`, `E3.wav`, ...).
//! Loading happens per tuning: every pitch the tuning uses is decoded in
//! parallel and resampled to the bank's rate. A file that is missing or
//! unreadable never fails the load; that pitch gets a synthesized tone
//! instead and a warning is logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

use tracing::{debug, info, warn};

use super::buffer::Sample;
use crate::error::NgoniError;
use crate::tuning::{frequency_of, Tuning};

#[derive(Debug)]
pub struct SampleBank {
    sample_rate: u32,
    dir: Option<PathBuf>,
    samples: RwLock<HashMap<String, Arc<Sample>>>,
}

impl SampleBank {
    /// A bank reading `<dir>/<PITCH>.wav`, or synthesizing every pitch when
    /// `dir` is `None`.
    pub fn new(sample_rate: u32, dir: Option<PathBuf>) -> Self {
        Self {
            sample_rate,
            dir,
            samples: RwLock::new(HashMap::new()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn get(&self, pitch: &str) -> Option<Arc<Sample>> {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pitch)
            .cloned()
    }

    pub fn contains(&self, pitch: &str) -> bool {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(pitch)
    }

    pub fn len(&self) -> usize {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a sample under its name, resampled to the bank rate.
    pub fn insert(&self, sample: Sample) {
        let sample = sample.resampled(self.sample_rate);
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sample.name.clone(), Arc::new(sample));
    }

    /// Make sure every pitch used by `tuning` has a sample. Pitches already
    /// cached are skipped. Returns how many pitches were added.
    pub fn load_for_tuning(&self, tuning: &Tuning) -> usize {
        let missing: Vec<String> = tuning
            .pitches()
            .into_iter()
            .filter(|pitch| !self.contains(pitch))
            .collect();
        if missing.is_empty() {
            return 0;
        }

        let loaded: Vec<Sample> = thread::scope(|scope| {
            let handles: Vec<_> = missing
                .iter()
                .map(|pitch| scope.spawn(move || self.load_pitch(pitch)))
                .collect();
            handles
                .into_iter()
                .zip(&missing)
                .map(|(handle, pitch)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| self.synthesize(pitch))
                })
                .collect()
        });

        let count = loaded.len();
        let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        for sample in loaded {
            samples.insert(sample.name.clone(), Arc::new(sample));
        }
        info!(count, total = samples.len(), "samples loaded");
        count
    }

    fn load_pitch(&self, pitch: &str) -> Sample {
        let Some(dir) = &self.dir else {
            debug!(pitch, "no sample directory, synthesizing");
            return self.synthesize(pitch);
        };
        let path = dir.join(format!("{}.wav", pitch));
        match read_wav(&path, pitch) {
            Ok(sample) => sample.resampled(self.sample_rate),
            Err(err) => {
                warn!(pitch, error = %err, "sample unavailable, using fallback tone");
                self.synthesize(pitch)
            }
        }
    }

    fn synthesize(&self, pitch: &str) -> Sample {
        Sample::fallback_tone(pitch, frequency_of(pitch), self.sample_rate)
    }
}

/// Decode a WAV file to mono f32, averaging channels.
pub fn read_wav(path: &Path, name: &str) -> Result<Sample, NgoniError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| wav_error(path, name, e))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, hound::Error>>()
            .map_err(|e| wav_error(path, name, e))?,
        hound::SampleFormat::Int => {
            let max = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max))
                .collect::<Result<_, hound::Error>>()
                .map_err(|e| wav_error(path, name, e))?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let frames = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(Sample::new(name, spec.sample_rate, frames))
}

fn wav_error(path: &Path, name: &str, err: hound::Error) -> NgoniError {
    match err {
        hound::Error::IoError(source) => NgoniError::io(path, source),
        other => NgoniError::Sample {
            note: name.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tablature::StringId;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ngoni-samples-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, data: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in data {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_directory_synthesizes_every_pitch() {
        let bank = SampleBank::new(8000, None);
        let added = bank.load_for_tuning(&Tuning::base());
        assert_eq!(added, 12);
        let e3 = bank.get("E3").unwrap();
        assert_eq!(e3.len(), 8000);
        assert_eq!(e3.sample_rate, 8000);
    }

    #[test]
    fn test_already_loaded_pitches_are_skipped() {
        let bank = SampleBank::new(8000, None);
        bank.load_for_tuning(&Tuning::base());
        assert_eq!(bank.load_for_tuning(&Tuning::base()), 0);

        let mut tuning = Tuning::base();
        tuning.set(StringId::new("1D"), "F3");
        assert_eq!(bank.load_for_tuning(&tuning), 1);
        assert_eq!(bank.len(), 13);
    }

    #[test]
    fn test_wav_file_is_loaded_and_downmixed() {
        let dir = temp_dir("load");
        write_wav(&dir.join("A4.wav"), 8000, 2, &[16384, 0, 16384, 16384]);

        let bank = SampleBank::new(8000, Some(dir.clone()));
        let mut tuning = Tuning::default();
        tuning.set(StringId::new("1D"), "A4");
        tuning.set(StringId::new("1G"), "C4");
        bank.load_for_tuning(&tuning);

        let a4 = bank.get("A4").unwrap();
        assert_eq!(a4.len(), 2);
        assert!((a4.frames[0] - 0.25).abs() < 1e-4);
        assert!((a4.frames[1] - 0.5).abs() < 1e-4);

        // no C4.wav in the directory
        assert_eq!(bank.get("C4").unwrap().len(), 8000);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("E3.wav"), b"not a wav file").unwrap();
        assert!(matches!(
            read_wav(&dir.join("E3.wav"), "E3"),
            Err(NgoniError::Sample { .. })
        ));

        let bank = SampleBank::new(8000, Some(dir.clone()));
        bank.load_for_tuning(&Tuning::from_notes("E3"));
        assert_eq!(bank.get("E3").unwrap().len(), 8000);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_wav(Path::new("/nonexistent/ngoni/E3.wav"), "E3").unwrap_err();
        assert!(matches!(err, NgoniError::Io { .. }));
    }
}
