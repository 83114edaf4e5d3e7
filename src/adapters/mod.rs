//! Adapter interfaces for the annotation backend.
//!
//! The backend is an external HTTP service; everything the session needs
//! from it goes through the [`AnnotationApi`] trait so the session can be
//! driven by a different transport (or a test double).

pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{AnnotationPayload, AnnotationRecord, SaveResponse, Utterance};
use crate::stats::Stats;

// Re-export the HTTP adapter
pub use http::HttpApi;

/// Operations offered by the annotation backend
#[async_trait]
pub trait AnnotationApi: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// All utterances for a model, in backend order
    async fn fetch_utterances(&self, model: &str) -> Result<Vec<Utterance>>;

    /// The reviewer's annotations for a model
    async fn fetch_annotations(&self, model: &str) -> Result<Vec<AnnotationRecord>>;

    /// Create or overwrite one annotation.
    ///
    /// `Err` means the request never produced a usable response; a response
    /// with `success: false` is returned as `Ok`.
    async fn save_annotation(&self, model: &str, payload: &AnnotationPayload)
        -> Result<SaveResponse>;

    /// Server-side progress figures
    async fn fetch_stats(&self, model: &str) -> Result<Stats>;

    /// Full export document for a model
    async fn fetch_export(&self, model: &str) -> Result<serde_json::Value>;
}
