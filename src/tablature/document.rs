//! Tablature document: source text plus the event list derived from it.
//!
//! The source text is the persisted form. Every edit goes through the
//! serializer (for event-level edits) or touches one source line directly,
//! then the event list is rebuilt from scratch by reparsing.

use serde::{Deserialize, Serialize};

use crate::timebase::{Tick, COUNT_IN, TICKS_PER_QUARTER};

use super::parser::parse;
use super::serializer::serialize;
use super::types::{Event, EventId, EventKind, Finger, StringId};

/// Number of previous sources kept for undo.
pub const HISTORY_LIMIT: usize = 20;

/// Two silent quarters filling the lead-in.
pub const LEAD_IN_HEADER: &str = "+   S\n+   S\n";

/// Smallest gap placed between a selection and its duplicate.
const MIN_DUPLICATE_GAP: Tick = 1.5;

/// A reusable group of events with ticks relative to the first one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub entries: Vec<BlockEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub tick: Tick,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Default)]
pub struct Tablature {
    source: String,
    events: Vec<Event>,
    history: Vec<String>,
}

/// Inside the lead-in, or not a position at all.
fn before_content(tick: Tick) -> bool {
    tick.is_nan() || tick < COUNT_IN
}

impl Tablature {
    /// An empty tablature holding only the lead-in rests.
    pub fn new() -> Self {
        Self::from_source(LEAD_IN_HEADER)
    }

    pub fn from_source(source: &str) -> Self {
        Self {
            source: source.to_string(),
            events: parse(source),
            history: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Replace the whole source, e.g. after a free-text edit.
    pub fn set_source(&mut self, source: &str) {
        if source == self.source {
            return;
        }
        let previous = std::mem::replace(&mut self.source, source.to_string());
        self.push_history(previous);
        self.events = parse(&self.source);
    }

    /// Add a note. Returns `false` (and changes nothing) inside the lead-in.
    pub fn insert_note(&mut self, string: StringId, finger: Option<Finger>, tick: Tick) -> bool {
        if before_content(tick) {
            return false;
        }
        let mut events = self.events.clone();
        events.push(Event::note(tick, string, finger));
        self.rewrite(&events);
        true
    }

    /// Add a text marker. Blank messages and lead-in positions are ignored.
    pub fn insert_text(&mut self, message: &str, tick: Tick) -> bool {
        if message.trim().is_empty() || before_content(tick) {
            return false;
        }
        let mut events = self.events.clone();
        events.push(Event::text(tick, message));
        self.rewrite(&events);
        true
    }

    /// Drag an event to a new position. Text and page breaks keep their kind
    /// and only move in time.
    pub fn move_event(&mut self, id: EventId, string: StringId, tick: Tick) -> bool {
        if before_content(tick) {
            return false;
        }
        let mut events = self.events.clone();
        let Some(event) = events.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        event.tick = tick;
        if let EventKind::Note { string: current, .. } = &mut event.kind {
            *current = string;
        }
        self.rewrite(&events);
        true
    }

    /// Remove one source line (the one an event was parsed from).
    pub fn delete_line(&mut self, line: usize) -> bool {
        let mut lines: Vec<&str> = self.source.trim().split('\n').collect();
        if line >= lines.len() {
            return false;
        }
        lines.remove(line);
        let source = lines.join("\n");
        self.set_source(&source);
        true
    }

    /// Rewrite a note line with an explicit finger, keeping its delta.
    pub fn set_finger(&mut self, line: usize, finger: Finger) -> bool {
        let mut lines: Vec<String> = self.source.trim().split('\n').map(str::to_string).collect();
        let Some(target) = lines.get_mut(line) else {
            return false;
        };
        let tokens: Vec<&str> = target.split_whitespace().collect();
        if tokens.len() < 2 {
            return false;
        }
        *target = format!("{}   {}   {}", tokens[0], tokens[1], finger.symbol());
        let source = lines.join("\n");
        self.set_source(&source);
        true
    }

    pub fn delete_events(&mut self, ids: &[EventId]) {
        if ids.is_empty() {
            return;
        }
        let kept: Vec<Event> = self
            .events
            .iter()
            .filter(|e| !ids.contains(&e.id))
            .cloned()
            .collect();
        self.rewrite(&kept);
    }

    /// Copy the selected events right after the selection.
    ///
    /// The copy starts one "last spacing" after the last selected event, or a
    /// quarter later for a single event.
    pub fn duplicate(&mut self, ids: &[EventId]) -> bool {
        let selected = self.selection(ids);
        let (Some(first), Some(last)) = (selected.first(), selected.last()) else {
            return false;
        };
        let gap = if selected.len() > 1 {
            let before_last = selected[selected.len() - 2].tick;
            (last.tick - before_last).max(MIN_DUPLICATE_GAP)
        } else {
            TICKS_PER_QUARTER as Tick
        };
        let start = last.tick + gap;
        let first_tick = first.tick;

        let mut events = self.events.clone();
        events.extend(
            selected
                .iter()
                .map(|e| Event::new(start + (e.tick - first_tick), e.kind.clone())),
        );
        self.rewrite(&events);
        true
    }

    /// Capture a selection as a block for later pasting.
    pub fn copy_block(&self, ids: &[EventId], name: &str) -> Option<Block> {
        let selected = self.selection(ids);
        let start = selected.first()?.tick;
        Some(Block {
            name: name.to_string(),
            entries: selected
                .iter()
                .map(|e| BlockEntry {
                    tick: e.tick - start,
                    kind: e.kind.clone(),
                })
                .collect(),
        })
    }

    /// Paste a block at the cursor, never inside the lead-in.
    pub fn paste_block(&mut self, block: &Block, cursor: Tick) {
        if block.entries.is_empty() {
            return;
        }
        let start = cursor.max(COUNT_IN);
        let mut events = self.events.clone();
        events.extend(
            block
                .entries
                .iter()
                .map(|entry| Event::new(start + entry.tick, entry.kind.clone())),
        );
        self.rewrite(&events);
    }

    pub fn delete_last_line(&mut self) {
        let mut lines: Vec<&str> = self.source.trim().split('\n').collect();
        if lines.pop().is_some() {
            let source = lines.join("\n");
            self.set_source(&source);
        }
    }

    /// Restore the previous source. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.events = parse(&previous);
                self.source = previous;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    fn selection(&self, ids: &[EventId]) -> Vec<&Event> {
        // self.events is already tick-sorted
        self.events.iter().filter(|e| ids.contains(&e.id)).collect()
    }

    fn rewrite(&mut self, events: &[Event]) {
        let source = serialize(events);
        self.set_source(&source);
    }

    fn push_history(&mut self, previous: String) {
        self.history.push(previous);
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }
}
