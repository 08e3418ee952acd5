//! # Tablature Serializer
//!
//! Turns an absolute-tick event list back into delta-encoded tablature text,
//! the canonical persisted form. Used after every programmatic edit.
//!
//! ## Canonical Order
//! Events are sorted by `(tick, channel key)`, so the same set of events always
//! produces the same text regardless of insertion order.
//!
//! ## Line Rules
//! - Note: `=` when it shares the previous tick, else the numeric delta;
//!   the finger column is written only when a finger is set
//! - Text: `+` when it shares the previous tick, else the numeric delta
//! - Page break: always `+   PAGE`, and it does not move the delta origin
//!
//! The last two rules mean a page break, or a text at delta 0, reparses one
//! quarter later than where it was. Callers relying on exact round trips
//! should keep page breaks at the end of a section and text on its own tick.

use crate::timebase::Tick;

use super::types::{Event, EventKind};

/// Column separator used in generated text.
const SEP: &str = "   ";

/// Serialize events to tablature text.
pub fn serialize(events: &[Event]) -> String {
    let mut sorted: Vec<&Event> = events.iter().filter(|e| is_serializable(e)).collect();
    sorted.sort_by(|a, b| {
        a.tick
            .total_cmp(&b.tick)
            .then_with(|| a.channel_key().cmp(b.channel_key()))
    });

    let mut last_tick: Tick = 0.0;
    let mut lines = Vec::with_capacity(sorted.len());

    for event in sorted {
        match &event.kind {
            EventKind::Text { message } => {
                let delta = (event.tick - last_tick).max(0.0);
                let symbol = if delta == 0.0 {
                    "+".to_string()
                } else {
                    format_ticks(delta)
                };
                lines.push(format!("{symbol}{SEP}TXT{SEP}{message}"));
                last_tick = event.tick;
            }
            EventKind::PageBreak => lines.push(format!("+{SEP}PAGE")),
            EventKind::Note { string, finger } => {
                let delta = (event.tick - last_tick).max(0.0);
                let symbol = if delta == 0.0 {
                    "=".to_string()
                } else {
                    format_ticks(delta)
                };
                let mut line = format!("{symbol}{SEP}{string}");
                if let Some(finger) = finger {
                    line.push_str(SEP);
                    line.push_str(finger.symbol());
                }
                lines.push(line);
                last_tick = event.tick;
            }
        }
    }

    lines.join("\n")
}

/// Notes without a string id cannot be written back.
fn is_serializable(event: &Event) -> bool {
    match &event.kind {
        EventKind::Note { string, .. } => !string.is_empty(),
        _ => true,
    }
}

/// `12` for whole ticks, `1.5` for fractional ones.
pub(crate) fn format_ticks(ticks: Tick) -> String {
    format!("{}", ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tablature::types::Finger;

    #[test]
    fn test_basic_deltas() {
        let events = vec![
            Event::note(24.0, "1D", None),
            Event::note(36.0, "2G", Some(Finger::Thumb)),
            Event::note(37.5, "3D", Some(Finger::Index)),
        ];
        assert_eq!(
            serialize(&events),
            "24   1D\n12   2G   P\n1.5   3D   I"
        );
    }

    #[test]
    fn test_ties_sorted_by_string_id() {
        let events = vec![
            Event::note(24.0, "4G", None),
            Event::note(24.0, "1D", None),
            Event::note(24.0, "2D", None),
        ];
        assert_eq!(serialize(&events), "24   1D\n=   2D\n=   4G");
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let a = vec![
            Event::note(36.0, "5G", None),
            Event::text(48.0, "Fin"),
            Event::note(24.0, "1G", None),
        ];
        let b = vec![a[2].clone(), a[1].clone(), a[0].clone()];
        assert_eq!(serialize(&a), serialize(&b));
    }

    #[test]
    fn test_text_lines() {
        let events = vec![Event::note(24.0, "1D", None), Event::text(36.0, "Refrain x2")];
        assert_eq!(serialize(&events), "24   1D\n12   TXT   Refrain x2");

        let stacked = vec![Event::note(24.0, "1D", None), Event::text(24.0, "Début")];
        assert_eq!(serialize(&stacked), "24   1D\n+   TXT   Début");
    }

    #[test]
    fn test_page_break_keeps_delta_origin() {
        let events = vec![
            Event::note(24.0, "1D", None),
            Event::page_break(60.0),
            Event::note(48.0, "2D", None),
            Event::note(72.0, "3D", None),
        ];
        assert_eq!(
            serialize(&events),
            "24   1D\n24   2D\n+   PAGE\n24   3D"
        );
    }

    #[test]
    fn test_empty_string_dropped() {
        let events = vec![
            Event::note(24.0, "", None),
            Event::note(36.0, "1G", None),
        ];
        assert_eq!(serialize(&events), "36   1G");
    }

    #[test]
    fn test_note_at_origin_is_stacked() {
        let events = vec![Event::note(0.0, "1D", None)];
        assert_eq!(serialize(&events), "=   1D");
    }

    #[test]
    fn test_empty() {
        assert_eq!(serialize(&[]), "");
    }
}
