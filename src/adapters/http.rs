//! HTTP client for the annotation backend.
//!
//! Endpoints:
//! - GET  /api/utterances/{model}
//! - GET  /api/annotations/{model}
//! - POST /api/annotations/{model}
//! - GET  /api/stats/{model}
//! - GET  /api/export?model={model}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::AnnotationApi;
use crate::config::ResolvedConfig;
use crate::domain::{parse_each, AnnotationPayload, AnnotationRecord, SaveResponse, Utterance};
use crate::stats::Stats;

/// reqwest-backed [`AnnotationApi`]
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base URL cannot have a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}) for {}: {}", status, url, text.trim())
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl AnnotationApi for HttpApi {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_utterances(&self, model: &str) -> Result<Vec<Utterance>> {
        let url = self.endpoint(&["api", "utterances", model])?;
        let items = self.get_json(url).await?;
        Ok(parse_each(items, "utterance"))
    }

    async fn fetch_annotations(&self, model: &str) -> Result<Vec<AnnotationRecord>> {
        let url = self.endpoint(&["api", "annotations", model])?;
        let items = self.get_json(url).await?;
        Ok(parse_each(items, "annotation"))
    }

    async fn save_annotation(
        &self,
        model: &str,
        payload: &AnnotationPayload,
    ) -> Result<SaveResponse> {
        let url = self.endpoint(&["api", "annotations", model])?;
        debug!(%url, error_id = %payload.error_id, "POST annotation");

        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to send annotation to {}", url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read annotation response")?;

        match serde_json::from_str::<SaveResponse>(&text) {
            Ok(mut result) => {
                if !status.is_success() {
                    result.success = false;
                    if result.error.is_none() {
                        result.error = Some(format!("HTTP {}", status));
                    }
                }
                Ok(result)
            }
            // Error pages are not JSON; still a server-side rejection
            Err(_) if !status.is_success() => Ok(SaveResponse {
                success: false,
                error: Some(format!("HTTP {}: {}", status, text.trim())),
                ..Default::default()
            }),
            Err(e) => Err(e).context("Failed to parse annotation response"),
        }
    }

    async fn fetch_stats(&self, model: &str) -> Result<Stats> {
        let url = self.endpoint(&["api", "stats", model])?;
        self.get_json(url).await
    }

    async fn fetch_export(&self, model: &str) -> Result<serde_json::Value> {
        let mut url = self.endpoint(&["api", "export"])?;
        url.query_pairs_mut().append_pair("model", model);
        self.get_json(url).await
    }
}
