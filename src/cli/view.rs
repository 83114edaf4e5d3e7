//! Terminal and HTML views of a rendered utterance.

use crate::core::{AnnotationCache, OpenForm};
use crate::domain::{Judgment, Severity, Utterance};
use crate::overlay::{escape_html, Overlay};
use crate::stats::{Stats, Summary};

const MARK_ANNOTATED: &str = "✓";
const MARK_PENDING: &str = "·";

/// Reconstructed text with every rendered span replaced by `⟦n TYPE text⟧`.
///
/// `n` is the 1-based number used by `open <n>`.
pub fn annotate_text(text: &str, overlay: &Overlay) -> String {
    let mut out = String::with_capacity(text.len() + overlay.spans.len() * 8);
    let mut cursor = 0;

    for (index, span) in overlay.spans.iter().enumerate() {
        out.push_str(&text[cursor..span.start]);
        out.push_str(&format!(
            "⟦{} {} {}{}⟧",
            index + 1,
            span.target.error_type,
            &text[span.start..span.end],
            if span.annotated { MARK_ANNOTATED } else { "" }
        ));
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn judgment_line(judgment: &Judgment) -> String {
    let tags: Vec<String> = judgment.taxonomy.iter().map(|t| t.to_string()).collect();
    format!("{} | {}", tags.join(", "), judgment.severity)
}

/// Print the utterance under the cursor with its numbered error spans
pub fn print_utterance(
    position: usize,
    total: usize,
    utterance: &Utterance,
    overlay: &Overlay,
    cache: &AnnotationCache,
) {
    println!();
    println!(
        "── Utterance {}/{} ({}) ──",
        position + 1,
        total,
        utterance.utterance_id
    );
    println!("Reference: {}", utterance.human_transcript);
    println!("ASR:       {}", annotate_text(&utterance.asr_reconstructed, overlay));
    println!();

    if overlay.spans.is_empty() {
        println!("  (no errors)");
    }
    for (index, span) in overlay.spans.iter().enumerate() {
        let target = &span.target;
        let mark = if span.annotated { MARK_ANNOTATED } else { MARK_PENDING };
        let mut line = format!(
            "  {} {:>2}. {} {}",
            mark,
            index + 1,
            target.error_type,
            target.error_match
        );
        if let Some(judgment) = cache.judgment_for(target) {
            line.push_str(&format!("  [{}]", judgment_line(judgment)));
        }
        println!("{}", line);
    }
    if overlay.skipped > 0 {
        println!("  ({} error(s) could not be placed)", overlay.skipped);
    }
    println!(
        "  {}/{} annotated",
        overlay.annotated_count(),
        overlay.spans.len()
    );
}

/// Print the open form with its current input
pub fn print_form(form: &OpenForm, categories: &[String]) {
    let target = &form.target;
    println!();
    println!(
        "Annotating #{}: {} {}",
        form.target_index + 1,
        target.error_type,
        target.error_match
    );
    println!("Taxonomy:");
    for category in categories {
        let checked = if form.selected.contains(category) { "x" } else { " " };
        println!("  [{}] {}", checked, category);
    }
    println!(
        "Custom:   {}",
        if form.custom_text.is_empty() { "(none)" } else { form.custom_text.as_str() }
    );
    match Severity::new(form.severity) {
        Some(severity) => println!("Severity: {}", severity),
        None => println!("Severity: {} (invalid)", form.severity),
    }
}

pub fn print_stats(model: &str, stats: &Stats) {
    println!("Model:        {}", model);
    println!("Utterances:   {}", stats.total_utterances);
    println!("Errors:       {}", stats.total_errors);
    println!("Annotations:  {}", stats.total_annotations);
    println!("Progress:     {:.1}%", stats.progress);
}

pub fn print_summary(summary: &Summary) {
    if summary.total == 0 {
        println!("No annotations yet");
        return;
    }

    println!("Annotations:      {}", summary.total);
    println!("Average severity: {:.2}", summary.average_severity);
    if let Some(label) = summary.modal_severity() {
        println!("Most common:      {}", label);
    }
    println!();
    println!("Severity:");
    for (level, count) in summary.severity_histogram.iter().enumerate() {
        println!("  {} {:<10} {}", level, Severity::LABELS[level], count);
    }
    println!();
    println!("Taxonomy:");
    for (tag, count) in &summary.taxonomy {
        println!("  {:<24} {}", tag, count);
    }
}

const PAGE_STYLE: &str = r#"
body { font-family: sans-serif; max-width: 60rem; margin: 2rem auto; line-height: 1.6; }
.transcript { padding: 1rem; border: 1px solid #ddd; border-radius: 4px; }
.error-highlight { padding: 0 2px; border-radius: 3px; cursor: pointer; }
.del-error { background: #fdd; text-decoration: line-through; }
.sub-error { background: #ffd; }
.ins-error { background: #dfd; }
.error-highlight.annotated { outline: 2px solid #4a4; }
.error-highlight.unannotated { outline: 1px dashed #a44; }
.error-status-indicator { display: inline-block; width: 6px; height: 6px; border-radius: 50%; margin-right: 2px; }
.annotated .error-status-indicator { background: #4a4; }
.unannotated .error-status-indicator { background: #a44; }
"#;

/// Standalone HTML page showing one rendered utterance
pub fn html_page(model: &str, utterance: &Utterance, overlay: &Overlay) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{model} - {id}</title>
<style>{style}</style>
</head>
<body>
<h1>{id}</h1>
<h2>Reference</h2>
<div class="transcript human">{human}</div>
<h2>ASR ({annotated}/{total} annotated)</h2>
<div class="transcript asr" data-utterance-id="{id}">{markup}</div>
</body>
</html>
"#,
        model = escape_html(model),
        id = escape_html(&utterance.utterance_id),
        style = PAGE_STYLE,
        human = escape_html(&utterance.human_transcript),
        annotated = overlay.annotated_count(),
        total = overlay.spans.len(),
        markup = overlay.markup,
    )
}
