//! In-memory cache of the reviewer's judgments.
//!
//! Judgments are stored once, under their canonical identifier (the stable
//! error id, or the id derived from the legacy triple). A second index maps
//! legacy composite keys to canonical identifiers, so a span addressed either
//! way resolves to the same judgment.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{AnnotationRecord, ErrorRef, ErrorTarget, Judgment};

/// Judgments for one model session
#[derive(Debug, Clone, Default)]
pub struct AnnotationCache {
    /// Canonical id -> judgment
    judgments: HashMap<String, Judgment>,
    /// Legacy key -> canonical id
    legacy_index: HashMap<String, String>,
}

impl AnnotationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the cache from the server's annotation list
    pub fn load(&mut self, records: &[AnnotationRecord]) {
        self.judgments.clear();
        self.legacy_index.clear();

        for record in records {
            let id = record.canonical_id();
            self.legacy_index.insert(record.legacy_key(), id.clone());
            self.judgments.insert(id, record.judgment());
        }

        debug!(count = self.judgments.len(), "Annotation cache loaded");
    }

    /// Store a judgment after the server acknowledged it
    pub fn upsert(&mut self, target: &ErrorTarget, judgment: Judgment) {
        let id = target.submission_id();
        self.legacy_index.insert(target.legacy_key(), id.clone());
        self.judgments.insert(id, judgment);
    }

    /// Canonical identifier for a reference, if a judgment exists
    pub fn resolve(&self, error_ref: &ErrorRef) -> Option<&str> {
        match error_ref {
            ErrorRef::Stable(id) => self
                .judgments
                .get_key_value(id)
                .map(|(key, _)| key.as_str()),
            ErrorRef::Legacy { .. } => self
                .legacy_index
                .get(&error_ref.key())
                .map(String::as_str),
        }
    }

    pub fn get(&self, error_ref: &ErrorRef) -> Option<&Judgment> {
        self.resolve(error_ref).and_then(|id| self.judgments.get(id))
    }

    pub fn has(&self, error_ref: &ErrorRef) -> bool {
        self.get(error_ref).is_some()
    }

    /// Judgment of one rendered error.
    ///
    /// Targets with a stable id never fall back to their legacy key.
    pub fn judgment_for(&self, target: &ErrorTarget) -> Option<&Judgment> {
        self.get(&target.error_ref())
    }

    /// Look up by a raw key of either form
    pub fn get_key(&self, key: &str) -> Option<&Judgment> {
        self.judgments.get(key).or_else(|| {
            self.legacy_index
                .get(key)
                .and_then(|id| self.judgments.get(id))
        })
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get_key(key).is_some()
    }

    /// Number of distinct judgments
    pub fn len(&self) -> usize {
        self.judgments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }

    /// All judgments, in no particular order
    pub fn judgments(&self) -> impl Iterator<Item = &Judgment> {
        self.judgments.values()
    }
}
