//! Domain types for asr-review.
//!
//! This module contains the core data structures:
//! - Utterance: Transcripts and their error records
//! - ErrorRef / ErrorTarget: How an error span is addressed
//! - Judgment: A reviewer's classification, plus the API payloads

pub mod annotation;
pub mod error_ref;
pub mod lenient;
pub mod utterance;

// Re-export commonly used types
pub use annotation::{
    AnnotationPayload, AnnotationRecord, Judgment, SaveResponse, Severity, TaxonomyTag,
    CUSTOM_TAG_PREFIX,
};
pub use error_ref::{derive_legacy_id, legacy_key, ErrorRef, ErrorTarget, LEGACY_ID_PREFIX};
pub use lenient::parse_each;
pub use utterance::{ErrorRecord, ErrorType, Utterance, UtteranceMetadata};
