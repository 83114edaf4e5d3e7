//! Export of a model's annotations to a local JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::info;

use crate::adapters::AnnotationApi;

/// `annotations_{model}_{unix millis}.json`
pub fn export_filename(model: &str, at: DateTime<Utc>) -> String {
    let model: String = model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("annotations_{}_{}.json", model, at.timestamp_millis())
}

/// Write an export document as pretty JSON, returning the file path
pub async fn write_export(
    dir: &Path,
    model: &str,
    data: &serde_json::Value,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

    let path = dir.join(export_filename(model, at));
    let content = serde_json::to_string_pretty(data).context("Failed to serialize export")?;
    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write export: {}", path.display()))?;

    Ok(path)
}

/// Fetch the export document for `model` and save it under `dir`
pub async fn export_annotations<A: AnnotationApi + ?Sized>(
    api: &A,
    model: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let data = api
        .fetch_export(model)
        .await
        .with_context(|| format!("Failed to fetch export for model {}", model))?;

    let path = write_export(dir, model, &data, Utc::now()).await?;

    let total = data.get("total_annotations").and_then(|v| v.as_u64());
    info!(model, path = %path.display(), total, "Annotations exported");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_export_filename() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            export_filename("whisper", at),
            "annotations_whisper_1700000000123.json"
        );
        assert_eq!(
            export_filename("org/model v2", at),
            "annotations_org_model_v2_1700000000123.json"
        );
    }

    #[tokio::test]
    async fn test_write_export_creates_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("exports");
        let data = serde_json::json!({"total_annotations": 1, "annotations": [{"errorId": "e"}]});
        let at = Utc.timestamp_millis_opt(42).unwrap();

        let path = write_export(&dir, "phi4", &data, at).await.unwrap();
        assert_eq!(path, dir.join("annotations_phi4_42.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, data);
    }

    #[test]
    fn test_write_export_overwrites_same_millis() {
        let temp = TempDir::new().unwrap();
        let at = Utc.timestamp_millis_opt(7).unwrap();

        let one = serde_json::json!({"n": 1});
        let two = serde_json::json!({"n": 2});
        let first = tokio_test::block_on(write_export(temp.path(), "m", &one, at)).unwrap();
        let second = tokio_test::block_on(write_export(temp.path(), "m", &two, at)).unwrap();

        assert_eq!(first, second);
        let content = std::fs::read_to_string(&second).unwrap();
        assert!(content.contains("\"n\": 2"));
    }
}
