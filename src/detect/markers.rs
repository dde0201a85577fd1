//! Marker comments (`TODO`, `FIXME`, `HACK`, `BUG`, `NOTE`, `XXX`).
//!
//! Only comment text found by the stripper is searched, so a marker inside a
//! string literal is not reported. Tags are matched in upper case to keep
//! prose such as "note that" out of the results.

use lazy_static::lazy_static;
use regex::Regex;

use super::strip::Stripped;
use super::types::{MarkerComment, MarkerKind};

lazy_static! {
    static ref MARKER_PATTERN: Regex = Regex::new(
        r"\b(TODO|FIXME|HACK|BUG|NOTE|XXX)\b(?:\([^)]*\))?\s*[:\-]?\s*(.*)"
    ).unwrap();
}

/// Collect marker comments, one per line at most.
pub fn detect_markers(stripped: &Stripped) -> Vec<MarkerComment> {
    stripped
        .comments
        .iter()
        .enumerate()
        .filter_map(|(idx, comment)| {
            let caps = MARKER_PATTERN.captures(comment)?;
            let kind = MarkerKind::parse(&caps[1])?;
            let text = caps[2]
                .trim()
                .trim_end_matches("*/")
                .trim_end_matches("-->")
                .trim()
                .to_string();
            Some(MarkerComment {
                text,
                kind,
                line_number: idx + 1,
            })
        })
        .collect()
}
