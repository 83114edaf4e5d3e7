//! Utterances and the error records attached to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of discrepancy marked in a reconstructed transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorType {
    /// Word present in the reference but missing from the ASR output
    Del,
    /// Word replaced by a different word
    Sub,
    /// Word present in the ASR output but not in the reference
    Ins,
}

impl ErrorType {
    /// All error types, in the order markers are scanned
    pub const ALL: [ErrorType; 3] = [ErrorType::Del, ErrorType::Sub, ErrorType::Ins];

    /// Marker token as it appears in `[DEL:...]`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Del => "DEL",
            ErrorType::Sub => "SUB",
            ErrorType::Ins => "INS",
        }
    }

    /// CSS class used for the highlighted span
    pub fn css_class(&self) -> &'static str {
        match self {
            ErrorType::Del => "del-error",
            ErrorType::Sub => "sub-error",
            ErrorType::Ins => "ins-error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEL" => Ok(ErrorType::Del),
            "SUB" => Ok(ErrorType::Sub),
            "INS" => Ok(ErrorType::Ins),
            other => Err(format!("Unknown error type: {}", other)),
        }
    }
}

/// One error occurrence as listed in utterance metadata.
///
/// Field names follow the backend's error extractor. Offsets are character
/// indices into `asr_reconstructed`, half-open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stable identifier for this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,

    pub error_type: ErrorType,

    /// Full marker text including brackets, e.g. `[DEL:world]`
    pub error_match: String,

    /// Content inside the brackets
    #[serde(default)]
    pub error_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_idx: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_idx: Option<usize>,
}

impl ErrorRecord {
    /// Both offsets, when present
    pub fn offsets(&self) -> Option<(usize, usize)> {
        match (self.start_idx, self.end_idx) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// Structured metadata attached to an utterance by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceMetadata {
    /// Malformed records are dropped on load
    #[serde(default, deserialize_with = "super::lenient::skip_malformed_errors")]
    pub errors: Vec<ErrorRecord>,
}

/// One unit of transcript under review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub utterance_id: String,

    #[serde(default)]
    pub human_transcript: String,

    /// ASR output with inline `[TYPE:...]` markers
    #[serde(default)]
    pub asr_reconstructed: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UtteranceMetadata>,
}

impl Utterance {
    /// Errors listed in metadata (empty in legacy mode)
    pub fn errors(&self) -> &[ErrorRecord] {
        self.metadata
            .as_ref()
            .map(|m| m.errors.as_slice())
            .unwrap_or(&[])
    }

    /// Whether this utterance is addressed by stable error identifiers
    pub fn has_stable_errors(&self) -> bool {
        !self.errors().is_empty()
    }
}
