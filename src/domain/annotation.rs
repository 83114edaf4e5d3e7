//! Judgments and the annotation wire payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error_ref::{derive_legacy_id, legacy_key};
use super::utterance::ErrorType;

/// Prefix of free-text taxonomy tags
pub const CUSTOM_TAG_PREFIX: &str = "custom:";

/// Severity of an error, 0 (none) to 5 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MAX: u8 = 5;

    /// Display labels, indexed by level
    pub const LABELS: [&'static str; 6] = ["None", "Minor", "Low", "Medium", "High", "Critical"];

    pub fn new(level: i64) -> Option<Self> {
        if (0..=Self::MAX as i64).contains(&level) {
            Some(Self(level as u8))
        } else {
            None
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        Self::LABELS[self.0 as usize]
    }
}

impl TryFrom<i64> for Severity {
    type Error = String;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        Severity::new(level).ok_or_else(|| format!("Severity out of range 0-5: {}", level))
    }
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> Self {
        s.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.0)
    }
}

/// One taxonomy classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaxonomyTag {
    /// A fixed category token
    Category(String),
    /// Reviewer-supplied free text, serialized as `custom:<text>`
    Custom(String),
}

impl TaxonomyTag {
    pub fn custom(text: &str) -> Self {
        TaxonomyTag::Custom(text.trim().to_string())
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, TaxonomyTag::Custom(_))
    }
}

impl From<String> for TaxonomyTag {
    fn from(s: String) -> Self {
        match s.strip_prefix(CUSTOM_TAG_PREFIX) {
            Some(text) => TaxonomyTag::Custom(text.to_string()),
            None => TaxonomyTag::Category(s),
        }
    }
}

impl From<&str> for TaxonomyTag {
    fn from(s: &str) -> Self {
        TaxonomyTag::from(s.to_string())
    }
}

impl From<TaxonomyTag> for String {
    fn from(tag: TaxonomyTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for TaxonomyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomyTag::Category(c) => f.write_str(c),
            TaxonomyTag::Custom(text) => write!(f, "{}{}", CUSTOM_TAG_PREFIX, text),
        }
    }
}

/// A reviewer's classification of one error span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub taxonomy: Vec<TaxonomyTag>,
    pub severity: Severity,
}

impl Judgment {
    /// Text of the first custom tag, if any
    pub fn custom_text(&self) -> Option<&str> {
        self.taxonomy.iter().find_map(|t| match t {
            TaxonomyTag::Custom(text) => Some(text.as_str()),
            TaxonomyTag::Category(_) => None,
        })
    }

    /// Fixed category tokens only
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.taxonomy.iter().filter_map(|t| match t {
            TaxonomyTag::Category(c) => Some(c.as_str()),
            TaxonomyTag::Custom(_) => None,
        })
    }
}

/// An annotation as returned by `GET /api/annotations/{model}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    pub utterance_id: String,
    pub error_type: ErrorType,
    pub error_match: String,
    pub taxonomy: Vec<TaxonomyTag>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance_index: Option<usize>,
}

impl AnnotationRecord {
    pub fn judgment(&self) -> Judgment {
        Judgment {
            taxonomy: self.taxonomy.clone(),
            severity: self.severity,
        }
    }

    pub fn legacy_key(&self) -> String {
        legacy_key(&self.utterance_id, self.error_type, &self.error_match)
    }

    /// Stable identifier, or the one derived from the legacy triple
    pub fn canonical_id(&self) -> String {
        match &self.error_id {
            Some(id) => id.clone(),
            None => derive_legacy_id(&self.utterance_id, self.error_type, &self.error_match),
        }
    }
}

/// Body of `POST /api/annotations/{model}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPayload {
    pub error_id: String,
    pub utterance_id: String,
    pub error_type: ErrorType,
    pub error_match: String,
    pub taxonomy: Vec<TaxonomyTag>,
    pub severity: Severity,
    pub utterance_index: usize,
    pub human_transcript: String,
    pub asr_reconstructed: String,
}

impl AnnotationPayload {
    pub fn judgment(&self) -> Judgment {
        Judgment {
            taxonomy: self.taxonomy.clone(),
            severity: self.severity,
        }
    }
}

/// Response of `POST /api/annotations/{model}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `created` or `updated`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Annotation count for this model after the save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}
