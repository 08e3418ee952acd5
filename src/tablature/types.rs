//! Tablature event type definitions

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::timebase::Tick;

/// Session-unique event identifier.
///
/// Ids are handed out fresh on every parse, so they correlate selection and
/// undo within one view of the event list but never survive a reparse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

impl EventId {
    pub fn next() -> Self {
        EventId(NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Hand playing a string: `G` (gauche, left) or `D` (droite, right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hand {
    G,
    D,
}

/// Channel identifier such as `1D` or `6G`.
///
/// Any token the parser does not recognize as a command becomes a string id
/// (uppercased), so values outside the 12 standard channels can exist; they
/// simply have no pitch in the tuning and stay silent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringId(String);

impl StringId {
    /// The 12 standard channels, lowest pitch first.
    pub const CHANNELS: [&'static str; 12] = [
        "1D", "1G", "2D", "2G", "3D", "3G", "4D", "4G", "5D", "5G", "6D", "6G",
    ];

    pub fn new(id: &str) -> Self {
        StringId(id.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is one of the 12 standard channels.
    pub fn is_standard(&self) -> bool {
        Self::CHANNELS.contains(&self.0.as_str())
    }

    pub fn hand(&self) -> Option<Hand> {
        if !self.is_standard() {
            return None;
        }
        match self.0.chars().last() {
            Some('G') => Some(Hand::G),
            Some('D') => Some(Hand::D),
            _ => None,
        }
    }

    /// String number 1-6 counted from the instrument's center.
    pub fn index(&self) -> Option<u8> {
        if !self.is_standard() {
            return None;
        }
        self.0.chars().next()?.to_digit(10).map(|d| d as u8)
    }

    /// All 12 standard channels.
    pub fn all() -> impl Iterator<Item = StringId> {
        Self::CHANNELS.into_iter().map(StringId::new)
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StringId {
    fn from(s: &str) -> Self {
        StringId::new(s)
    }
}

/// Plucking finger. Absence on a note means "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Finger {
    #[serde(rename = "P")]
    Thumb,
    #[serde(rename = "I")]
    Index,
}

impl Finger {
    pub fn from_token(token: &str) -> Option<Finger> {
        match token.to_uppercase().as_str() {
            "P" => Some(Finger::Thumb),
            "I" => Some(Finger::Index),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Finger::Thumb => "P",
            Finger::Index => "I",
        }
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// What an event is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventKind {
    Note {
        #[serde(rename = "stringId")]
        string: StringId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finger: Option<Finger>,
    },
    Text {
        message: String,
    },
    /// Pagination hint for renderers; carries no data.
    PageBreak,
}

/// One timed entry of the tablature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub tick: Tick,
    #[serde(flatten)]
    pub kind: EventKind,
    /// 0-based source line this event was parsed from. `None` for events
    /// created programmatically and not yet written back to text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl Event {
    pub fn new(tick: Tick, kind: EventKind) -> Self {
        Self {
            id: EventId::next(),
            tick,
            kind,
            source_line: None,
        }
    }

    pub fn note(tick: Tick, string: impl Into<StringId>, finger: Option<Finger>) -> Self {
        Self::new(
            tick,
            EventKind::Note {
                string: string.into(),
                finger,
            },
        )
    }

    pub fn text(tick: Tick, message: impl Into<String>) -> Self {
        Self::new(
            tick,
            EventKind::Text {
                message: message.into(),
            },
        )
    }

    pub fn page_break(tick: Tick) -> Self {
        Self::new(tick, EventKind::PageBreak)
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::Note { .. })
    }

    pub fn string(&self) -> Option<&StringId> {
        match &self.kind {
            EventKind::Note { string, .. } => Some(string),
            _ => None,
        }
    }

    pub fn finger(&self) -> Option<Finger> {
        match &self.kind {
            EventKind::Note { finger, .. } => *finger,
            _ => None,
        }
    }

    /// Secondary sort key for events sharing a tick.
    pub fn channel_key(&self) -> &str {
        match &self.kind {
            EventKind::Note { string, .. } => string.as_str(),
            EventKind::Text { .. } => "TEXTE",
            EventKind::PageBreak => "PAGE_BREAK",
        }
    }

    /// Equal in everything but `id` and `source_line`.
    pub fn same_content(&self, other: &Event) -> bool {
        self.tick == other.tick && self.kind == other.kind
    }
}
