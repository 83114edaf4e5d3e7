//! Legacy error discovery from inline bracket markers.
//!
//! Transcripts without error metadata carry their errors inline as
//! `[DEL:...]`, `[SUB:...]` and `[INS:...]`. Each type is scanned with its own
//! pattern; the results are merged into document order.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::ErrorType;

/// One bracket marker found in a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub error_type: ErrorType,
    /// UTF-8 byte offset of `[`
    pub start: usize,
    /// UTF-8 byte offset just past `]`
    pub end: usize,
    /// Full marker text, brackets included
    pub matched: String,
    /// Text between `TYPE:` and `]`
    pub content: String,
}

static MARKER_PATTERNS: OnceLock<Vec<(ErrorType, Regex)>> = OnceLock::new();

fn marker_patterns() -> &'static [(ErrorType, Regex)] {
    MARKER_PATTERNS.get_or_init(|| {
        ErrorType::ALL
            .iter()
            .map(|t| {
                let pattern = format!(r"\[{}:([^\]]+)\]", t.as_str());
                // Built from a fixed token, cannot fail
                let regex = Regex::new(&pattern).expect("marker pattern is valid");
                (*t, regex)
            })
            .collect()
    })
}

/// Find every marker in `text`, in document order.
///
/// Matches of a single type never overlap. Markers of different types can
/// (e.g. `[DEL:a [SUB:b]`); both are reported and the renderer decides.
pub fn discover_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();

    for (error_type, regex) in marker_patterns() {
        for caps in regex.captures_iter(text) {
            let (Some(full), Some(content)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            markers.push(Marker {
                error_type: *error_type,
                start: full.start(),
                end: full.end(),
                matched: full.as_str().to_string(),
                content: content.as_str().to_string(),
            });
        }
    }

    // Stable: equal starts keep scan order (DEL, SUB, INS)
    markers.sort_by_key(|m| m.start);
    markers
}

/// Count markers without materialising them
pub fn count_markers(text: &str) -> usize {
    marker_patterns()
        .iter()
        .map(|(_, regex)| regex.find_iter(text).count())
        .sum()
}
