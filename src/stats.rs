//! Progress statistics and judgment summaries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Judgment, Severity, Utterance};
use crate::overlay::{count_markers, render_utterance, AnnotationLookup};

/// Progress figures, as served by `GET /api/stats/{model}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_utterances: usize,
    #[serde(default)]
    pub total_errors: usize,
    #[serde(default)]
    pub total_annotations: usize,
    /// Percentage of errors annotated, one decimal
    #[serde(default)]
    pub progress: f64,
}

impl Stats {
    /// Compute figures from the data loaded in this session
    pub fn local<L: AnnotationLookup + ?Sized>(utterances: &[Utterance], annotated: &L) -> Self {
        let mut total_errors = 0;
        let mut total_annotations = 0;

        for utterance in utterances {
            total_errors += if utterance.has_stable_errors() {
                utterance.errors().len()
            } else {
                count_markers(&utterance.asr_reconstructed)
            };
            total_annotations += render_utterance(utterance, annotated).annotated_count();
        }

        Self {
            total_utterances: utterances.len(),
            total_errors,
            total_annotations,
            progress: percent(total_annotations, total_errors),
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Aggregate view over a set of judgments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub average_severity: f64,
    /// Count per severity level, index = level
    pub severity_histogram: [usize; 6],
    /// Tag and count, most frequent first (ties by name)
    pub taxonomy: Vec<(String, usize)>,
}

impl Summary {
    pub fn from_judgments<'a>(judgments: impl IntoIterator<Item = &'a Judgment>) -> Self {
        let mut total = 0;
        let mut severity_sum = 0u64;
        let mut histogram = [0usize; 6];
        let mut counts: HashMap<String, usize> = HashMap::new();

        for judgment in judgments {
            total += 1;
            let level = judgment.severity.level();
            severity_sum += level as u64;
            histogram[level as usize] += 1;
            for tag in &judgment.taxonomy {
                *counts.entry(tag.to_string()).or_default() += 1;
            }
        }

        let mut taxonomy: Vec<(String, usize)> = counts.into_iter().collect();
        taxonomy.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let average_severity = if total == 0 {
            0.0
        } else {
            (severity_sum as f64 / total as f64 * 100.0).round() / 100.0
        };

        Self {
            total,
            average_severity,
            severity_histogram: histogram,
            taxonomy,
        }
    }

    /// Most common severity label, if any judgments exist
    pub fn modal_severity(&self) -> Option<&'static str> {
        if self.total == 0 {
            return None;
        }
        let (level, _) = self
            .severity_histogram
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(&a.0)))?;
        Some(Severity::LABELS[level])
    }
}
