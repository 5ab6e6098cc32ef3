//! Line markup parsing
//!
//! Line templates carry two kinds of inline markup after placeholder
//! substitution: `*...*` bold pairs and `[RRGGBB]` color switches. Both
//! scanners are single-pass and never fail; anything that does not parse as
//! markup stays literal text.

use super::color::normalize_color;
use super::view::LineSegment;

/// Strip every `*` from a line and report whether it was bold.
///
/// The scan is a simple open/close toggle with no nesting or escaping: a
/// line counts as bold only when at least one complete pair occurred. An
/// unmatched trailing `*` is still removed but does not set the flag.
pub fn strip_bold_markers(raw: &str) -> (String, bool) {
    if raw.is_empty() {
        return (String::new(), false);
    }
    let mut text = String::with_capacity(raw.len());
    let mut inside = false;
    let mut pair_found = false;
    for c in raw.chars() {
        if c == '*' {
            if inside {
                pair_found = true;
            }
            inside = !inside;
            continue;
        }
        text.push(c);
    }
    (text, pair_found)
}

/// Split a line into colored segments.
///
/// A `[RRGGBB]` or `[#RRGGBB]` marker switches the current color for the
/// characters that follow and is removed from the output; bracket content
/// that fails hex validation stays literal. A line with no markers yields
/// exactly one segment (possibly empty) carrying the empty default color.
pub fn parse_segments(value: &str) -> Vec<LineSegment> {
    let mut segments = Vec::new();
    let mut current_color = String::new();
    let mut buffer = String::new();

    let mut i = 0;
    while i < value.len() {
        let c = match value[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        if c == '[' {
            if let Some(rel) = value[i..].find(']') {
                let close = i + rel;
                if close > i + 1 {
                    let normalized = normalize_color(&value[i + 1..close]);
                    if !normalized.is_empty() {
                        if !buffer.is_empty() {
                            segments.push(LineSegment::new(
                                std::mem::take(&mut buffer),
                                current_color.clone(),
                            ));
                        }
                        current_color = normalized;
                        i = close + 1;
                        continue;
                    }
                }
            }
        }
        buffer.push(c);
        i += c.len_utf8();
    }

    if !buffer.is_empty() {
        segments.push(LineSegment::new(buffer, current_color));
    } else if segments.is_empty() {
        segments.push(LineSegment::new(String::new(), current_color));
    }
    segments
}

// =============================================================================
// TESTS
// =============================================================================
