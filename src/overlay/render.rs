//! Rendering error spans as interactive markup.
//!
//! Every replacement range is computed against the original text, then the
//! replacements are spliced in descending start order so that a splice never
//! shifts the offsets of a range still waiting to be applied. Text between
//! spans is escaped in the same pass.
//!
//! Metadata offsets are character indices; they are mapped to UTF-8 byte
//! offsets before slicing. Ranges that are empty, reversed, out of bounds or
//! overlapping an earlier range are skipped.

use std::collections::HashSet;

use tracing::debug;

use super::discover::{discover_markers, Marker};
use super::escape::{escape_html, push_escaped};
use crate::core::cache::AnnotationCache;
use crate::domain::{ErrorRecord, ErrorTarget, Utterance};

/// Answers whether a span already has a judgment
pub trait AnnotationLookup {
    fn is_annotated(&self, target: &ErrorTarget) -> bool;
}

/// A set of annotated keys, stable ids and legacy keys mixed.
///
/// A target with a stable id is matched by that id only; several errors
/// can share one legacy key.
impl AnnotationLookup for HashSet<String> {
    fn is_annotated(&self, target: &ErrorTarget) -> bool {
        match &target.error_id {
            Some(id) => self.contains(id),
            None => self.contains(&target.legacy_key()),
        }
    }
}

impl AnnotationLookup for AnnotationCache {
    fn is_annotated(&self, target: &ErrorTarget) -> bool {
        self.judgment_for(target).is_some()
    }
}

/// One pending splice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Byte offset into the original text
    pub start: usize,
    /// Byte offset into the original text (exclusive)
    pub end: usize,
    pub markup: String,
}

/// A span that made it into the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSpan {
    pub target: ErrorTarget,
    pub annotated: bool,
    /// Byte range in the original text
    pub start: usize,
    pub end: usize,
}

/// Output of one render pass.
///
/// `spans` doubles as the handler registry: the `data-target` attribute of
/// each rendered element is an index into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub markup: String,
    pub spans: Vec<RenderedSpan>,
    /// Errors that could not be placed
    pub skipped: usize,
}

impl Overlay {
    /// Resolve a `data-target` index
    pub fn target(&self, index: usize) -> Option<&ErrorTarget> {
        self.spans.get(index).map(|s| &s.target)
    }

    pub fn annotated_count(&self) -> usize {
        self.spans.iter().filter(|s| s.annotated).count()
    }
}

/// A located error, before overlap resolution
#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    end: usize,
    target: ErrorTarget,
    /// Discovery order, breaks ties at equal start
    order: usize,
}

/// Render an utterance's reconstructed transcript
pub fn render_utterance<L: AnnotationLookup + ?Sized>(utterance: &Utterance, annotated: &L) -> Overlay {
    render(
        &utterance.utterance_id,
        &utterance.asr_reconstructed,
        utterance.errors(),
        annotated,
    )
}

/// Render `text` with every locatable error wrapped in a span.
///
/// With an empty `errors` list, errors are discovered from bracket markers
/// (legacy mode).
pub fn render<L: AnnotationLookup + ?Sized>(
    utterance_id: &str,
    text: &str,
    errors: &[ErrorRecord],
    annotated: &L,
) -> Overlay {
    let mut skipped = 0;

    let mut candidates = if errors.is_empty() {
        legacy_candidates(utterance_id, text)
    } else {
        metadata_candidates(utterance_id, text, errors, &mut skipped)
    };

    candidates.sort_by_key(|c| (c.start, c.order));

    let mut spans: Vec<RenderedSpan> = Vec::with_capacity(candidates.len());
    let mut last_end = 0;
    for candidate in candidates {
        if candidate.start < last_end {
            debug!(
                utterance_id,
                start = candidate.start,
                end = candidate.end,
                "Skipping error span overlapping an earlier one"
            );
            skipped += 1;
            continue;
        }
        last_end = candidate.end;
        let is_annotated = annotated.is_annotated(&candidate.target);
        spans.push(RenderedSpan {
            target: candidate.target,
            annotated: is_annotated,
            start: candidate.start,
            end: candidate.end,
        });
    }

    let replacements = spans
        .iter()
        .enumerate()
        .map(|(index, span)| Replacement {
            start: span.start,
            end: span.end,
            markup: span_markup(index, span, &text[span.start..span.end]),
        })
        .collect();

    Overlay {
        markup: apply_replacements(text, replacements),
        spans,
        skipped,
    }
}

/// Splice replacements into `text`, escaping everything in between.
///
/// Replacements are applied by descending start (ties in input order). A
/// replacement reaching into one already applied is dropped.
pub fn apply_replacements(text: &str, mut replacements: Vec<Replacement>) -> String {
    replacements.sort_by(|a, b| b.start.cmp(&a.start));

    let mut out = text.to_string();
    // Everything at or past `cursor` has been converted already
    let mut cursor = text.len();

    for r in &replacements {
        if r.start >= r.end || r.end > cursor {
            continue;
        }
        let mut fragment = String::with_capacity(r.markup.len() + (cursor - r.end));
        fragment.push_str(&r.markup);
        push_escaped(&mut fragment, &text[r.end..cursor]);
        out.replace_range(r.start..cursor, &fragment);
        cursor = r.start;
    }

    out.replace_range(..cursor, &escape_html(&text[..cursor]));
    out
}

fn legacy_candidates(utterance_id: &str, text: &str) -> Vec<Candidate> {
    discover_markers(text)
        .into_iter()
        .enumerate()
        .map(|(order, marker)| Candidate {
            start: marker.start,
            end: marker.end,
            target: ErrorTarget {
                utterance_id: utterance_id.to_string(),
                error_id: None,
                error_type: marker.error_type,
                error_match: marker.matched,
                error_text: marker.content,
            },
            order,
        })
        .collect()
}

fn metadata_candidates(
    utterance_id: &str,
    text: &str,
    errors: &[ErrorRecord],
    skipped: &mut usize,
) -> Vec<Candidate> {
    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut candidates = Vec::with_capacity(errors.len());
    let mut unplaced = Vec::new();

    for (order, error) in errors.iter().enumerate() {
        let target = ErrorTarget {
            utterance_id: utterance_id.to_string(),
            error_id: error.error_id.clone(),
            error_type: error.error_type,
            error_match: error.error_match.clone(),
            error_text: error.error_text.clone(),
        };

        let Some((start, end)) = error.offsets() else {
            unplaced.push((order, target));
            continue;
        };

        if end <= start || start >= char_len || end > char_len {
            debug!(
                utterance_id,
                error_id = ?error.error_id,
                start,
                end,
                char_len,
                "Skipping error with invalid offsets"
            );
            *skipped += 1;
            continue;
        }

        candidates.push(Candidate {
            start: boundaries[start],
            end: boundaries[end],
            target,
            order,
        });
    }

    if !unplaced.is_empty() {
        let markers = discover_markers(text);
        let mut claimed: Vec<bool> = markers
            .iter()
            .map(|m| candidates.iter().any(|c| c.start == m.start && c.end == m.end))
            .collect();

        for (order, target) in unplaced {
            match claim_marker(&markers, &mut claimed, &target) {
                Some(marker) => candidates.push(Candidate {
                    start: marker.start,
                    end: marker.end,
                    target,
                    order,
                }),
                None => {
                    debug!(
                        utterance_id,
                        error_match = %target.error_match,
                        "No marker found for error without offsets"
                    );
                    *skipped += 1;
                }
            }
        }
    }

    candidates
}

/// First unclaimed marker whose literal matches the target
fn claim_marker<'a>(
    markers: &'a [Marker],
    claimed: &mut [bool],
    target: &ErrorTarget,
) -> Option<&'a Marker> {
    let index = markers
        .iter()
        .enumerate()
        .position(|(i, m)| !claimed[i] && m.matched == target.error_match)?;
    claimed[index] = true;
    Some(&markers[index])
}

fn span_markup(index: usize, span: &RenderedSpan, span_text: &str) -> String {
    let target = &span.target;
    let state = if span.annotated { "annotated" } else { "unannotated" };

    let mut out = format!(
        r#"<span class="error-highlight {} {}" data-target="{}""#,
        target.error_type.css_class(),
        state,
        index
    );
    if let Some(id) = &target.error_id {
        push_attr(&mut out, "data-error-id", id);
    }
    push_attr(&mut out, "data-error-type", target.error_type.as_str());
    push_attr(&mut out, "data-error-match", &target.error_match);
    push_attr(&mut out, "data-error-text", &target.error_text);
    out.push_str(r#"><span class="error-status-indicator"></span>"#);
    push_escaped(&mut out, span_text);
    out.push_str("</span>");
    out
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_escaped(out, value);
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationRecord, ErrorType, Severity, TaxonomyTag};
    use crate::overlay::escape::unescape_html;
    use regex::Regex;

    const MARK: &str = "\u{1}";

    /// Replace each rendered span with MARK and unescape the rest
    fn flatten(markup: &str) -> String {
        let span = Regex::new(
            r#"<span class="error-highlight[^>]*><span class="error-status-indicator"></span>[^<]*</span>"#,
        )
        .unwrap();
        unescape_html(&span.replace_all(markup, MARK))
    }

    /// Original text with each char range replaced by MARK
    fn expected(text: &str, ranges: &[(usize, usize)]) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut sorted = ranges.to_vec();
        sorted.sort();
        let mut out = String::new();
        let mut pos = 0;
        for (start, end) in sorted {
            out.extend(&chars[pos..start]);
            out.push_str(MARK);
            pos = end;
        }
        out.extend(&chars[pos..]);
        out
    }

    fn record(id: &str, start: Option<usize>, end: Option<usize>, matched: &str) -> ErrorRecord {
        ErrorRecord {
            error_id: Some(id.to_string()),
            error_type: ErrorType::Del,
            error_match: matched.to_string(),
            error_text: String::new(),
            start_idx: start,
            end_idx: end,
        }
    }

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_legacy_render_wraps_markers() {
        let overlay = render("u1", "a [DEL:foo] b [SUB:bar] c", &[], &none());
        assert_eq!(overlay.spans.len(), 2);
        assert_eq!(overlay.skipped, 0);
        assert_eq!(flatten(&overlay.markup), format!("a {MARK} b {MARK} c"));
        assert!(overlay.markup.contains(r#"class="error-highlight del-error unannotated" data-target="0""#));
        assert!(overlay.markup.contains(r#"class="error-highlight sub-error unannotated" data-target="1""#));
        assert!(overlay.markup.contains(r#"data-error-match="[SUB:bar]""#));
        assert!(!overlay.markup.contains("data-error-id"));
        assert_eq!(overlay.target(1).unwrap().error_text, "bar");
    }

    #[test]
    fn test_offsets_independent_of_discovery_order() {
        let text = "the quick brown fox jumps";
        let ranges = [(4, 9), (16, 19), (0, 3)];
        let forward: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(i, (s, e))| record(&format!("e{i}"), Some(*s), Some(*e), ""))
            .collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = render("u", text, &forward, &none());
        let b = render("u", text, &reversed, &none());

        assert_eq!(flatten(&a.markup), expected(text, &ranges));
        assert_eq!(flatten(&a.markup), flatten(&b.markup));
        assert_eq!(a.spans.len(), 3);
    }

    #[test]
    fn test_invalid_ranges_are_skipped() {
        let text = "0123456789";
        let errors = vec![
            record("ok1", Some(0), Some(2), ""),
            record("empty", Some(4), Some(4), ""),
            record("reversed", Some(6), Some(5), ""),
            record("past_end", Some(8), Some(11), ""),
            record("start_oob", Some(10), Some(12), ""),
            record("ok2", Some(7), Some(10), ""),
        ];
        let overlay = render("u", text, &errors, &none());
        assert_eq!(overlay.skipped, 4);
        assert_eq!(flatten(&overlay.markup), expected(text, &[(0, 2), (7, 10)]));
    }

    #[test]
    fn test_overlapping_range_is_skipped() {
        let text = "abcdefghij";
        let errors = vec![
            record("first", Some(1), Some(5), ""),
            record("overlaps", Some(3), Some(7), ""),
            record("after", Some(8), Some(9), ""),
        ];
        let overlay = render("u", text, &errors, &none());
        assert_eq!(overlay.skipped, 1);
        let ids: Vec<_> = overlay
            .spans
            .iter()
            .map(|s| s.target.error_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["first", "after"]);
        assert_eq!(flatten(&overlay.markup), expected(text, &[(1, 5), (8, 9)]));
    }

    #[test]
    fn test_char_offsets_on_multibyte_text() {
        let text = "naïve [DEL:café] ok";
        // chars: "naïve " is 6 chars, marker is 10 chars
        let errors = vec![record("e", Some(6), Some(16), "[DEL:café]")];
        let overlay = render("u", text, &errors, &none());
        assert_eq!(overlay.skipped, 0);
        assert!(overlay.markup.contains("</span>[DEL:café]</span>"));
        assert_eq!(flatten(&overlay.markup), format!("naïve {MARK} ok"));
    }

    #[test]
    fn test_missing_offsets_claim_markers_in_order() {
        let text = "x [INS:okay] y [INS:okay] z";
        let errors = vec![
            record("second", Some(15), Some(25), "[INS:okay]"),
            record("first", None, None, "[INS:okay]"),
            record("ghost", None, None, "[DEL:nothing]"),
        ];
        let overlay = render("u", text, &errors, &none());
        assert_eq!(overlay.skipped, 1);
        assert_eq!(overlay.spans.len(), 2);
        assert_eq!(overlay.spans[0].target.error_id.as_deref(), Some("first"));
        assert_eq!(overlay.spans[0].start, 2);
        assert_eq!(overlay.spans[1].target.error_id.as_deref(), Some("second"));
    }

    #[test]
    fn test_markup_escapes_everything() {
        let text = "<b>x</b> [SUB:a\"b'c&d] & more";
        let overlay = render("u<1>", text, &[], &none());
        assert_eq!(overlay.spans.len(), 1);
        assert!(!overlay.markup.contains("<b>"));
        assert!(overlay.markup.starts_with("&lt;b&gt;x&lt;/b&gt; "));
        assert!(overlay.markup.contains(r#"data-error-text="a&quot;b&#039;c&amp;d""#));
        assert!(overlay.markup.ends_with("</span> &amp; more"));
        assert_eq!(flatten(&overlay.markup), format!("<b>x</b> {MARK} & more"));
    }

    #[test]
    fn test_annotated_state_by_stable_or_legacy_key() {
        let text = "a [DEL:foo] b [SUB:bar]";
        let mut keys = HashSet::new();
        keys.insert("u1_SUB_[SUB:bar]".to_string());

        let overlay = render("u1", text, &[], &keys);
        assert!(!overlay.spans[0].annotated);
        assert!(overlay.spans[1].annotated);
        assert!(overlay.markup.contains("sub-error annotated"));
        assert_eq!(overlay.annotated_count(), 1);

        let errors = vec![record("stable-1", Some(2), Some(11), "[DEL:foo]")];
        keys.insert("stable-1".to_string());
        let overlay = render("u1", text, &errors, &keys);
        assert!(overlay.spans[0].annotated);
        assert!(overlay.markup.contains(r#"data-error-id="stable-1""#));
    }

    #[test]
    fn test_duplicate_markers_annotated_by_own_id() {
        let text = "x [INS:okay] y [INS:okay] z";
        let errors = vec![
            record("first", Some(2), Some(12), "[INS:okay]"),
            record("second", Some(15), Some(25), "[INS:okay]"),
        ];

        let mut keys = none();
        keys.insert("first".to_string());
        keys.insert("u_DEL_[INS:okay]".to_string());
        let overlay = render("u", text, &errors, &keys);
        assert!(overlay.spans[0].annotated);
        assert!(!overlay.spans[1].annotated);

        let mut cache = AnnotationCache::new();
        cache.load(&[AnnotationRecord {
            error_id: Some("first".to_string()),
            utterance_id: "u".to_string(),
            error_type: ErrorType::Del,
            error_match: "[INS:okay]".to_string(),
            taxonomy: vec![TaxonomyTag::from("fluency")],
            severity: Severity::new(1).unwrap(),
            timestamp: None,
            utterance_index: None,
        }]);
        let overlay = render("u", text, &errors, &cache);
        assert!(overlay.spans[0].annotated);
        assert!(!overlay.spans[1].annotated);
        assert_eq!(overlay.annotated_count(), 1);
    }

    #[test]
    fn test_legacy_span_finds_stable_saved_record() {
        let mut cache = AnnotationCache::new();
        cache.load(&[AnnotationRecord {
            error_id: Some("stable-9".to_string()),
            utterance_id: "u".to_string(),
            error_type: ErrorType::Ins,
            error_match: "[INS:okay]".to_string(),
            taxonomy: vec![],
            severity: Severity::default(),
            timestamp: None,
            utterance_index: None,
        }]);
        let overlay = render("u", "x [INS:okay] z", &[], &cache);
        assert!(overlay.spans[0].annotated);
    }

    #[test]
    fn test_apply_replacements_ties_and_overlaps() {
        let text = "abcdef";
        let reps = vec![
            Replacement { start: 1, end: 3, markup: "[X]".to_string() },
            Replacement { start: 2, end: 4, markup: "[Y]".to_string() },
            Replacement { start: 4, end: 6, markup: "[Z]".to_string() },
        ];
        // [Z] applied first, then [Y], then [X] reaches into [Y] and is dropped
        assert_eq!(apply_replacements(text, reps), "ab[Y][Z]");
    }

    #[test]
    fn test_no_errors_escapes_whole_text() {
        let overlay = render("u", "plain & simple", &[], &none());
        assert!(overlay.spans.is_empty());
        assert_eq!(overlay.markup, "plain &amp; simple");
    }
}
