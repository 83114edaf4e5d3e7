//! Addressing of error spans.
//!
//! An error is addressed either by the stable identifier assigned by the
//! backend, or, when no identifier exists, by the composite legacy key
//! `{utterance_id}_{TYPE}_{match}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::utterance::ErrorType;

/// Prefix of identifiers derived from a legacy triple
pub const LEGACY_ID_PREFIX: &str = "legacy-";

/// Reference to one error span
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorRef {
    /// Identifier assigned by the backend
    Stable(String),
    /// Composite key for spans discovered from bracket markers
    Legacy {
        utterance_id: String,
        error_type: ErrorType,
        error_match: String,
    },
}

impl ErrorRef {
    /// Canonical string form used as a lookup key
    pub fn key(&self) -> String {
        match self {
            ErrorRef::Stable(id) => id.clone(),
            ErrorRef::Legacy {
                utterance_id,
                error_type,
                error_match,
            } => legacy_key(utterance_id, *error_type, error_match),
        }
    }
}

impl fmt::Display for ErrorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Build the legacy composite key
pub fn legacy_key(utterance_id: &str, error_type: ErrorType, error_match: &str) -> String {
    format!("{}_{}_{}", utterance_id, error_type.as_str(), error_match)
}

/// Deterministic identifier for an error that has no stable one.
///
/// `legacy-` followed by the first 8 bytes of
/// sha256(utterance_id + type + match), hex encoded.
pub fn derive_legacy_id(utterance_id: &str, error_type: ErrorType, error_match: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(utterance_id.as_bytes());
    hasher.update(error_type.as_str().as_bytes());
    hasher.update(error_match.as_bytes());
    let result = hasher.finalize();
    format!("{}{}", LEGACY_ID_PREFIX, hex::encode(&result[..8]))
}

/// The typed record behind one rendered span.
///
/// This is what a click on a span resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTarget {
    pub utterance_id: String,
    pub error_id: Option<String>,
    pub error_type: ErrorType,
    /// Literal span text, brackets included
    pub error_match: String,
    /// Content inside the brackets
    pub error_text: String,
}

impl ErrorTarget {
    /// Stable reference when available, legacy otherwise
    pub fn error_ref(&self) -> ErrorRef {
        match &self.error_id {
            Some(id) => ErrorRef::Stable(id.clone()),
            None => self.legacy_ref(),
        }
    }

    /// Legacy reference, always available
    pub fn legacy_ref(&self) -> ErrorRef {
        ErrorRef::Legacy {
            utterance_id: self.utterance_id.clone(),
            error_type: self.error_type,
            error_match: self.error_match.clone(),
        }
    }

    pub fn legacy_key(&self) -> String {
        legacy_key(&self.utterance_id, self.error_type, &self.error_match)
    }

    /// Identifier sent to the backend
    pub fn submission_id(&self) -> String {
        match &self.error_id {
            Some(id) => id.clone(),
            None => derive_legacy_id(&self.utterance_id, self.error_type, &self.error_match),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: Option<&str>) -> ErrorTarget {
        ErrorTarget {
            utterance_id: "utt_7".to_string(),
            error_id: id.map(|s| s.to_string()),
            error_type: ErrorType::Sub,
            error_match: "[SUB:bar]".to_string(),
            error_text: "bar".to_string(),
        }
    }

    #[test]
    fn test_legacy_key_format() {
        assert_eq!(
            legacy_key("utt_7", ErrorType::Sub, "[SUB:bar]"),
            "utt_7_SUB_[SUB:bar]"
        );
        assert_eq!(target(None).error_ref().key(), "utt_7_SUB_[SUB:bar]");
    }

    #[test]
    fn test_stable_ref_preferred() {
        let t = target(Some("abc"));
        assert_eq!(t.error_ref(), ErrorRef::Stable("abc".to_string()));
        assert_eq!(t.submission_id(), "abc");
        assert_eq!(t.legacy_key(), "utt_7_SUB_[SUB:bar]");
    }

    #[test]
    fn test_derived_id_deterministic() {
        let id1 = target(None).submission_id();
        let id2 = target(None).submission_id();
        assert_eq!(id1, id2);
        assert!(id1.starts_with(LEGACY_ID_PREFIX));
        assert_eq!(id1.len(), LEGACY_ID_PREFIX.len() + 16);

        let other = derive_legacy_id("utt_7", ErrorType::Del, "[SUB:bar]");
        assert_ne!(id1, other);
    }
}
