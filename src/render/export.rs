//! 16-bit PCM WAV encoding.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tracing::info;

use crate::audio::AudioBuffer;
use crate::error::NgoniError;

/// Scale to 16 bits asymmetrically so both -1.0 and 1.0 map to the ends of
/// the range.
fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

fn export_error(err: hound::Error) -> NgoniError {
    NgoniError::Export(err.to_string())
}

fn write_samples<W: Write + Seek>(buffer: &AudioBuffer, writer: W) -> Result<(), NgoniError> {
    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(writer, spec).map_err(export_error)?;
    for sample in &buffer.samples {
        writer.write_sample(to_i16(*sample)).map_err(export_error)?;
    }
    writer.finalize().map_err(export_error)
}

/// Encode `buffer` as an in-memory WAV file.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, NgoniError> {
    let mut cursor = Cursor::new(Vec::new());
    write_samples(buffer, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Write `buffer` to `path` as a 16-bit PCM WAV file.
pub fn export_wav(buffer: &AudioBuffer, path: &Path) -> Result<(), NgoniError> {
    let file = std::fs::File::create(path).map_err(|e| NgoniError::io(path, e))?;
    write_samples(buffer, std::io::BufWriter::new(file))?;
    info!(path = %path.display(), seconds = buffer.duration(), "wav exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> AudioBuffer {
        AudioBuffer {
            sample_rate: 8000,
            channels: 2,
            samples: vec![0.0, 1.0, -1.0, 0.5, 2.0, -3.0],
        }
    }

    #[test]
    fn test_sample_scaling() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(-1.0), i16::MIN);
        assert_eq!(to_i16(0.5), 16383);
        assert_eq!(to_i16(4.0), i16::MAX);
    }

    #[test]
    fn test_encoded_wav_reads_back() {
        let bytes = encode_wav(&buffer()).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 32767, -32768, 16383, 32767, -32768]);
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join(format!("ngoni-export-{}.wav", std::process::id()));
        export_wav(&buffer(), &path).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 3);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let err = export_wav(&buffer(), Path::new("/nonexistent/ngoni/out.wav")).unwrap_err();
        assert!(matches!(err, NgoniError::Io { .. }));
    }
}
