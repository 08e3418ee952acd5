//! # Tablature Module
//!
//! The tick-based tablature model and its text form.
//!
//! ## Purpose
//! A tablature is persisted as line-oriented text where each line advances a
//! time cursor and places one event. The editor works on absolute ticks, so
//! this module converts both ways:
//! 1. **Parsing** - text to a tick-sorted event list (fail-soft, never errors)
//! 2. **Serializing** - event list back to canonical delta-encoded text
//! 3. **Editing** - [`Tablature`] keeps text and events in sync on every edit
//!
//! ## Sub-modules
//! - `types` - Event, EventKind, StringId, Finger
//! - `parser` - text to events
//! - `serializer` - events to text
//! - `document` - the editable source + derived events pair
//!
//! ## Example
//! ```rust
//! use ngoni::tablature::{parse, serialize};
//!
//! let source = "24   1D\n=   1G   I\n12   TXT   Refrain";
//! let events = parse(source);
//! assert_eq!(events.len(), 3);
//! assert_eq!(serialize(&events), source);
//! ```
//!
//! ## Related Modules
//! - `timebase` - tick constants and duration symbols
//! - `transport` / `render` - consume the parsed event list

mod document;
mod parser;
mod serializer;
mod types;

#[cfg(test)]
mod tests;

pub use document::{Block, BlockEntry, Tablature, HISTORY_LIMIT, LEAD_IN_HEADER};
pub use parser::parse;
pub use serializer::serialize;
pub use types::{Event, EventId, EventKind, Finger, Hand, StringId};
