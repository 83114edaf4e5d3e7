//! Per-entry parsing of backend lists.
//!
//! One malformed record (an unknown error type, a severity out of range)
//! is logged and dropped; the rest of the list still loads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Parse each item on its own, skipping the ones that don't fit `T`
pub fn parse_each<T: DeserializeOwned>(items: Vec<Value>, kind: &str) -> Vec<T> {
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(&item) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(kind, index, entry = %item, error = %e, "Skipping malformed entry");
                None
            }
        })
        .collect();

    if parsed.len() < total {
        warn!(kind, kept = parsed.len(), total, "Some entries were skipped");
    }
    parsed
}

/// `deserialize_with` helper for nested lists of error records
pub fn skip_malformed_errors<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Vec::<Value>::deserialize(deserializer)?;
    Ok(parse_each(items, "error record"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationRecord, ErrorType};
    use serde_json::json;

    #[test]
    fn test_parse_each_keeps_valid_entries() {
        let items = vec![
            json!({"utteranceId": "u1", "errorType": "SUB", "errorMatch": "[SUB:a]",
                   "taxonomy": ["meaning"], "severity": 2}),
            json!({"utteranceId": "u2", "errorType": "SUB", "errorMatch": "[SUB:b]",
                   "taxonomy": [], "severity": 9}),
            json!({"utteranceId": "u3", "errorType": "FOO", "errorMatch": "[FOO:c]",
                   "taxonomy": [], "severity": 1}),
            json!("not a record"),
            json!({"utteranceId": "u4", "errorType": "INS", "errorMatch": "[INS:d]",
                   "taxonomy": [], "severity": 0}),
        ];

        let records: Vec<AnnotationRecord> = parse_each(items, "annotation");
        let ids: Vec<_> = records.iter().map(|r| r.utterance_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u4"]);
        assert_eq!(records[1].error_type, ErrorType::Ins);
    }

    #[test]
    fn test_parse_each_empty() {
        let records: Vec<AnnotationRecord> = parse_each(Vec::new(), "annotation");
        assert!(records.is_empty());
    }
}
