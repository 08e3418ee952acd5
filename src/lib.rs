pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod project;
pub mod render;
pub mod tablature;
pub mod timebase;
pub mod transport;
pub mod tuning;

pub use api::*;
pub use config::Config;
pub use error::*;
pub use project::Project;
pub use tablature::{parse, serialize, Event, EventKind, Finger, StringId, Tablature};
pub use timebase::{RhythmMode, Tempo, Tick, COUNT_IN};
pub use transport::{Transport, TransportEvent, TransportState};
pub use tuning::{ScalePreset, Tuning, SCALE_PRESETS};
