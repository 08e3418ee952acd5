//! # Error Types
//!
//! This module defines the error type shared by the whole crate.
//!
//! Parsing and serializing tablature text never fail: malformed lines are
//! absorbed by fail-soft defaults. Only resource problems cross the crate
//! boundary as errors:
//! - `AudioUnavailable` - no output device, or the stream refused to start
//! - `Io` - a file could not be read or written
//! - `Sample` - a sample file exists but could not be decoded
//! - `Project` / `Config` - malformed project JSON or configuration YAML
//! - `Export` - WAV encoding failed
//!
//! ## Usage
//! ```rust
//! use ngoni::NgoniError;
//!
//! let err = NgoniError::AudioUnavailable("no default output device".to_string());
//! match err {
//!     NgoniError::AudioUnavailable(reason) => eprintln!("Playback stopped: {}", reason),
//!     e => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NgoniError {
    /// The audio output could not be opened or started.
    ///
    /// Fatal to the current playback attempt; the transport falls back to
    /// `Stopped` and the caller decides how to tell the user.
    ///
    /// # Example
    /// ```
    /// # use ngoni::NgoniError;
    /// let err = NgoniError::AudioUnavailable("stream refused to start".to_string());
    /// assert_eq!(err.to_string(), "Audio output unavailable: stream refused to start");
    /// ```
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// File access failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sample file for `note` exists but could not be decoded.
    ///
    /// # Example
    /// ```
    /// # use ngoni::NgoniError;
    /// let err = NgoniError::Sample {
    ///     note: "G#4".to_string(),
    ///     message: "unsupported bit depth".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Sample error for G#4: unsupported bit depth");
    /// ```
    #[error("Sample error for {note}: {message}")]
    Sample { note: String, message: String },

    /// Invalid project file.
    #[error("Invalid project: {0}")]
    Project(String),

    /// Invalid configuration file.
    #[error("Invalid config: {0}")]
    Config(String),

    /// Audio export failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl NgoniError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NgoniError::Io {
            path: path.into(),
            source,
        }
    }
}
