//! # Tablature Parser
//!
//! Converts line-oriented tablature text into an absolute-tick event list.
//!
//! ## Line Format
//! ```text
//! <delta> <STRINGID> [FINGER]
//! <delta> TXT <message...>
//! <delta> PAGE
//! <delta> S
//! ```
//!
//! ## Delta Column
//! - `=` - go back to the tick of the previously emitted event (stacking)
//! - `12`, `1.5` - advance by that many ticks
//! - `+ ♪ 🎶 ♬ h w` - advance by a named duration, `+.` for dotted
//! - anything else - advance by a quarter (12 ticks)
//!
//! ## Fail-Soft
//! The parser never rejects input. Lines with fewer than two tokens are
//! skipped, unknown deltas advance by a quarter, and unknown content tokens
//! become string ids. Hand-edited text must never break the editor.
//!
//! ## Example
//! ```rust
//! use ngoni::tablature::parse;
//!
//! let events = parse("12   1D\n=   1G\n12   2D");
//! let ticks: Vec<f64> = events.iter().map(|e| e.tick).collect();
//! assert_eq!(ticks, vec![12.0, 12.0, 24.0]);
//! ```

use crate::timebase::{Duration, Tick, DEFAULT_ADVANCE};

use super::types::{Event, EventKind, Finger, StringId};

/// How the first column moves the time cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Delta {
    /// Reset to the previous event's tick.
    Stack,
    Advance(Tick),
}

/// Parse tablature text into events sorted by tick.
///
/// Parse order is kept among events sharing a tick (the sort is stable).
/// Every event carries the 0-based index of its line in the trimmed text.
pub fn parse(source: &str) -> Vec<Event> {
    let mut events: Vec<Event> = Vec::new();
    let source = source.trim();
    if source.is_empty() {
        return events;
    }

    let mut cursor: Tick = 0.0;

    for (index, line) in source.split('\n').enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }

        match resolve_delta(tokens[0]) {
            Delta::Stack => {
                if let Some(previous) = events.last() {
                    cursor = previous.tick;
                }
            }
            Delta::Advance(ticks) => cursor += ticks,
        }

        if let Some(kind) = resolve_content(&tokens[1..]) {
            events.push(Event {
                source_line: Some(index),
                ..Event::new(cursor, kind)
            });
        }
    }

    events.sort_by(|a, b| a.tick.total_cmp(&b.tick));
    events
}

fn resolve_delta(token: &str) -> Delta {
    if token == "=" {
        return Delta::Stack;
    }
    if is_plain_number(token) {
        if let Ok(ticks) = token.parse::<f64>() {
            return Delta::Advance(ticks);
        }
    }
    if let Some(duration) = Duration::from_symbol(token) {
        return Delta::Advance(duration.ticks() as Tick);
    }
    if let Some(duration) = token.strip_suffix('.').and_then(Duration::from_symbol) {
        return Delta::Advance(duration.dotted_ticks() as Tick);
    }
    Delta::Advance(DEFAULT_ADVANCE)
}

/// `digits` or `digits.digits`, nothing else (no sign, no exponent).
fn is_plain_number(token: &str) -> bool {
    let (whole, fraction) = match token.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (token, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

/// `tokens` starts at the content column. `None` means a rest.
fn resolve_content(tokens: &[&str]) -> Option<EventKind> {
    let command = tokens[0].to_uppercase();
    match command.as_str() {
        "TXT" => Some(EventKind::Text {
            message: tokens[1..].join(" "),
        }),
        "PAGE" => Some(EventKind::PageBreak),
        "S" | "SILENCE" | "SEP" => None,
        _ => Some(EventKind::Note {
            string: StringId::new(&command),
            finger: tokens.get(1).and_then(|t| Finger::from_token(t)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(events: &[Event]) -> Vec<f64> {
        events.iter().map(|e| e.tick).collect()
    }

    #[test]
    fn test_stacking_with_equals() {
        let events = parse("12   1D\n=   1G\n12   2D");
        assert_eq!(ticks(&events), vec![12.0, 12.0, 24.0]);
        let strings: Vec<&str> = events.iter().map(|e| e.string().unwrap().as_str()).collect();
        assert_eq!(strings, vec!["1D", "1G", "2D"]);
    }

    #[test]
    fn test_named_durations() {
        let events = parse("+   1D\n♪   1G\n🎶   2D\n♬   2G\nh   3D\nw   3G");
        assert_eq!(ticks(&events), vec![12.0, 18.0, 22.0, 25.0, 49.0, 97.0]);
    }

    #[test]
    fn test_dotted_quarter() {
        let events = parse("+.   4D");
        assert_eq!(events[0].tick, 18.0);
    }

    #[test]
    fn test_decimal_delta() {
        let events = parse("1.5   4D\n1.5   4G");
        assert_eq!(ticks(&events), vec![1.5, 3.0]);
    }

    #[test]
    fn test_unknown_delta_defaults_to_quarter() {
        let events = parse("???   4D");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tick, 12.0);
        assert_eq!(events[0].string().unwrap().as_str(), "4D");
    }

    #[test]
    fn test_malformed_numbers_are_unknown() {
        // Not plain numbers: each falls back to a quarter
        let events = parse("-3   1D\n12.   1G\n1e2   2D\n.5   2G");
        assert_eq!(ticks(&events), vec![12.0, 24.0, 36.0, 48.0]);
    }

    #[test]
    fn test_silence_only_advances() {
        let events = parse("+   S\n+   SILENCE\n+   sep\n1   1D");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tick, 37.0);
        assert_eq!(events[0].source_line, Some(3));
    }

    #[test]
    fn test_stack_after_silence_returns_to_last_event() {
        let events = parse("24   1D\n+   S\n=   2D");
        assert_eq!(ticks(&events), vec![24.0, 24.0]);
    }

    #[test]
    fn test_stack_on_empty_list_keeps_cursor() {
        let events = parse("+   S\n=   1D");
        assert_eq!(events[0].tick, 12.0);
    }

    #[test]
    fn test_text_preserves_case() {
        let events = parse("24   txt   Répéter 2x   Fin");
        assert_eq!(
            events[0].kind,
            EventKind::Text {
                message: "Répéter 2x Fin".to_string()
            }
        );
    }

    #[test]
    fn test_page_break() {
        let events = parse("24   1D\n+   PAGE");
        assert_eq!(events[1].kind, EventKind::PageBreak);
        assert_eq!(events[1].tick, 36.0);
    }

    #[test]
    fn test_finger_is_optional() {
        let events = parse("24   1d   i\n+   2G\n+   3D   x2");
        assert_eq!(events[0].string().unwrap().as_str(), "1D");
        assert_eq!(events[0].finger(), Some(Finger::Index));
        assert_eq!(events[1].finger(), None);
        assert_eq!(events[2].finger(), None);
    }

    #[test]
    fn test_short_lines_skipped() {
        let events = parse("24\n\n   \n+   1D");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tick, 12.0);
        assert_eq!(events[0].source_line, Some(3));
    }

    #[test]
    fn test_sorted_by_tick_stable() {
        let events = parse("36   1D\n=   2D\n12   3D\n+   S\n=   4D\n0   TXT   here");
        assert_eq!(ticks(&events), vec![36.0, 36.0, 48.0, 48.0, 48.0]);
        // Ties keep parse order
        let lines: Vec<usize> = events.iter().filter_map(|e| e.source_line).collect();
        assert_eq!(lines, vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn test_content_in_delta_column_is_not_a_command() {
        // "TXT" in the first column is just an unknown delta
        let events = parse("48   1D\nTXT   late");
        assert_eq!(events[1].tick, 60.0);
        assert_eq!(events[1].string().unwrap().as_str(), "LATE");
    }

    #[test]
    fn test_source_lines_relative_to_trimmed_text() {
        let events = parse("\n\n24   1D\n+   2D\n");
        assert_eq!(events[0].source_line, Some(0));
        assert_eq!(events[1].source_line, Some(1));
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").is_empty());
        assert!(parse("   \n  ").is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let events = parse("24   1D\r\n+   2G   P\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].finger(), Some(Finger::Thumb));
    }
}
