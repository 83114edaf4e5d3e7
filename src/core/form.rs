//! Annotation form: reviewer input to validated payload.
//!
//! Validation happens before anything touches the network. A submission
//! needs at least one taxonomy tag (a fixed category or a non-blank custom
//! category) and a severity in 0-5.

use thiserror::Error;
use tracing::info;

use crate::adapters::AnnotationApi;
use crate::domain::{
    AnnotationPayload, ErrorTarget, Judgment, Severity, TaxonomyTag, Utterance,
};

/// Reasons a submission does not go through
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Select at least one taxonomy category or enter a custom category")]
    Validation,

    #[error("Severity must be between 0 and 5, got {0}")]
    InvalidSeverity(i64),

    #[error("Unknown taxonomy category: {0}")]
    UnknownCategory(String),

    #[error("No error data found: {0}")]
    MissingData(String),

    #[error("Error saving annotation: {0:#}")]
    Network(anyhow::Error),

    #[error("Error saving annotation: {0}")]
    Server(String),
}

/// Server acknowledgement of a saved annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub error_id: String,
    pub judgment: Judgment,
    /// `created` or `updated`, when the server says
    pub action: Option<String>,
    pub count: Option<u64>,
}

/// Everything one submission needs
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    pub target: &'a ErrorTarget,
    pub utterance: &'a Utterance,
    /// Index of the utterance in backend order
    pub utterance_index: usize,
    pub selected: &'a [String],
    pub custom_text: &'a str,
    pub severity: i64,
}

/// Turn raw form input into a judgment
pub fn build_judgment(
    selected: &[String],
    custom_text: &str,
    severity: i64,
) -> Result<Judgment, SubmitError> {
    let mut taxonomy: Vec<TaxonomyTag> = Vec::with_capacity(selected.len() + 1);
    for category in selected {
        let tag = TaxonomyTag::Category(category.clone());
        if !taxonomy.contains(&tag) {
            taxonomy.push(tag);
        }
    }

    let custom = custom_text.trim();
    if !custom.is_empty() {
        taxonomy.push(TaxonomyTag::custom(custom));
    }

    if taxonomy.is_empty() {
        return Err(SubmitError::Validation);
    }

    let severity = Severity::new(severity).ok_or(SubmitError::InvalidSeverity(severity))?;

    Ok(Judgment { taxonomy, severity })
}

/// Validate a request and build the wire payload
pub fn build_payload(request: &SubmitRequest<'_>) -> Result<AnnotationPayload, SubmitError> {
    let target = request.target;
    if target.utterance_id != request.utterance.utterance_id {
        return Err(SubmitError::MissingData(format!(
            "error {} does not belong to utterance {}",
            target.error_ref(),
            request.utterance.utterance_id
        )));
    }

    let judgment = build_judgment(request.selected, request.custom_text, request.severity)?;

    Ok(AnnotationPayload {
        error_id: target.submission_id(),
        utterance_id: request.utterance.utterance_id.clone(),
        error_type: target.error_type,
        error_match: target.error_match.clone(),
        taxonomy: judgment.taxonomy,
        severity: judgment.severity,
        utterance_index: request.utterance_index,
        human_transcript: request.utterance.human_transcript.clone(),
        asr_reconstructed: request.utterance.asr_reconstructed.clone(),
    })
}

/// Validate, then post one annotation.
///
/// No request is made when validation fails. No retry on failure.
pub async fn submit<A: AnnotationApi + ?Sized>(
    api: &A,
    model: &str,
    request: &SubmitRequest<'_>,
) -> Result<Ack, SubmitError> {
    let payload = build_payload(request)?;

    let response = api
        .save_annotation(model, &payload)
        .await
        .map_err(SubmitError::Network)?;

    if !response.success {
        return Err(SubmitError::Server(
            response
                .error
                .unwrap_or_else(|| "request was not accepted".to_string()),
        ));
    }

    info!(
        error_id = %payload.error_id,
        utterance_id = %payload.utterance_id,
        severity = payload.severity.level(),
        action = ?response.action,
        "Annotation saved"
    );

    Ok(Ack {
        judgment: payload.judgment(),
        error_id: payload.error_id,
        action: response.action,
        count: response.count,
    })
}

/// State of an open form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenForm {
    /// Index into the overlay's target registry
    pub target_index: usize,
    pub target: ErrorTarget,
    /// Checked fixed categories
    pub selected: Vec<String>,
    pub custom_text: String,
    pub severity: i64,
}

/// The annotation form controller
#[derive(Debug, Clone)]
pub struct AnnotationForm {
    /// Fixed categories offered, in display order
    categories: Vec<String>,
    open: Option<OpenForm>,
}

impl AnnotationForm {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            open: None,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Open for a target, prefilled from an existing judgment
    pub fn open(&mut self, target_index: usize, target: ErrorTarget, existing: Option<&Judgment>) {
        let (selected, custom_text, severity) = match existing {
            Some(judgment) => (
                judgment.categories().map(str::to_string).collect(),
                judgment.custom_text().unwrap_or_default().to_string(),
                judgment.severity.level() as i64,
            ),
            None => (Vec::new(), String::new(), 0),
        };

        self.open = Some(OpenForm {
            target_index,
            target,
            selected,
            custom_text,
            severity,
        });
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn current(&self) -> Option<&OpenForm> {
        self.open.as_ref()
    }

    fn current_mut(&mut self) -> Result<&mut OpenForm, SubmitError> {
        self.open
            .as_mut()
            .ok_or_else(|| SubmitError::MissingData("no error selected".to_string()))
    }

    /// Flip a fixed category; returns whether it is now checked
    pub fn toggle(&mut self, category: &str) -> Result<bool, SubmitError> {
        if !self.categories.iter().any(|c| c == category) {
            return Err(SubmitError::UnknownCategory(category.to_string()));
        }
        let form = self.current_mut()?;

        if let Some(pos) = form.selected.iter().position(|c| c == category) {
            form.selected.remove(pos);
            Ok(false)
        } else {
            form.selected.push(category.to_string());
            Ok(true)
        }
    }

    pub fn set_custom(&mut self, text: &str) -> Result<(), SubmitError> {
        self.current_mut()?.custom_text = text.to_string();
        Ok(())
    }

    /// Set the severity level; out-of-range values are rejected
    pub fn set_severity(&mut self, level: i64) -> Result<Severity, SubmitError> {
        let severity = Severity::new(level).ok_or(SubmitError::InvalidSeverity(level))?;
        self.current_mut()?.severity = level;
        Ok(severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorType;

    fn target() -> ErrorTarget {
        ErrorTarget {
            utterance_id: "u1".to_string(),
            error_id: None,
            error_type: ErrorType::Sub,
            error_match: "[SUB:bar]".to_string(),
            error_text: "bar".to_string(),
        }
    }

    fn utterance() -> Utterance {
        Utterance {
            utterance_id: "u1".to_string(),
            human_transcript: "foo baz".to_string(),
            asr_reconstructed: "foo [SUB:bar]".to_string(),
            metadata: None,
        }
    }

    fn categories() -> Vec<String> {
        vec!["meaning".to_string(), "fluency".to_string()]
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        assert!(matches!(build_judgment(&[], "", 2), Err(SubmitError::Validation)));
        assert!(matches!(build_judgment(&[], "   ", 2), Err(SubmitError::Validation)));
    }

    #[test]
    fn test_custom_text_alone_is_enough() {
        let judgment = build_judgment(&[], "weird case", 3).unwrap();
        assert_eq!(judgment.taxonomy, vec![TaxonomyTag::from("custom:weird case")]);
        assert_eq!(judgment.taxonomy[0].to_string(), "custom:weird case");
    }

    #[test]
    fn test_custom_text_is_trimmed_and_appended() {
        let judgment = build_judgment(&["meaning".to_string()], "  accent ", 1).unwrap();
        let tags: Vec<String> = judgment.taxonomy.iter().map(|t| t.to_string()).collect();
        assert_eq!(tags, vec!["meaning", "custom:accent"]);
    }

    #[test]
    fn test_duplicate_categories_collapse() {
        let selected = vec!["meaning".to_string(), "meaning".to_string()];
        let judgment = build_judgment(&selected, "", 0).unwrap();
        assert_eq!(judgment.taxonomy.len(), 1);
    }

    #[test]
    fn test_severity_range() {
        let selected = vec!["meaning".to_string()];
        assert!(build_judgment(&selected, "", 0).is_ok());
        assert!(build_judgment(&selected, "", 5).is_ok());
        assert!(matches!(
            build_judgment(&selected, "", 6),
            Err(SubmitError::InvalidSeverity(6))
        ));
        assert!(matches!(
            build_judgment(&selected, "", -1),
            Err(SubmitError::InvalidSeverity(-1))
        ));
    }

    #[test]
    fn test_payload_uses_derived_id_for_legacy_target() {
        let target = target();
        let utterance = utterance();
        let selected = vec!["fluency".to_string()];
        let request = SubmitRequest {
            target: &target,
            utterance: &utterance,
            utterance_index: 7,
            selected: &selected,
            custom_text: "",
            severity: 2,
        };

        let payload = build_payload(&request).unwrap();
        assert_eq!(payload.error_id, target.submission_id());
        assert!(payload.error_id.starts_with("legacy-"));
        assert_eq!(payload.error_match, "[SUB:bar]");
        assert_eq!(payload.utterance_index, 7);
        assert_eq!(payload.human_transcript, "foo baz");
    }

    #[test]
    fn test_payload_rejects_foreign_target() {
        let mut target = target();
        target.utterance_id = "other".to_string();
        let utterance = utterance();
        let selected = vec!["fluency".to_string()];
        let request = SubmitRequest {
            target: &target,
            utterance: &utterance,
            utterance_index: 0,
            selected: &selected,
            custom_text: "",
            severity: 2,
        };
        assert!(matches!(build_payload(&request), Err(SubmitError::MissingData(_))));
    }

    #[test]
    fn test_open_prefills_existing_judgment() {
        let mut form = AnnotationForm::new(categories());
        let existing = Judgment {
            taxonomy: vec![TaxonomyTag::from("meaning"), TaxonomyTag::custom("accent")],
            severity: Severity::new(4).unwrap(),
        };
        form.open(2, target(), Some(&existing));

        let open = form.current().unwrap();
        assert_eq!(open.target_index, 2);
        assert_eq!(open.selected, vec!["meaning".to_string()]);
        assert_eq!(open.custom_text, "accent");
        assert_eq!(open.severity, 4);
    }

    #[test]
    fn test_open_resets_previous_state() {
        let mut form = AnnotationForm::new(categories());
        form.open(0, target(), None);
        form.toggle("meaning").unwrap();
        form.set_custom("x").unwrap();

        form.open(1, target(), None);
        let open = form.current().unwrap();
        assert!(open.selected.is_empty());
        assert!(open.custom_text.is_empty());
        assert_eq!(open.severity, 0);
    }

    #[test]
    fn test_toggle_and_setters() {
        let mut form = AnnotationForm::new(categories());
        assert!(matches!(form.toggle("meaning"), Err(SubmitError::MissingData(_))));

        form.open(0, target(), None);
        assert!(form.toggle("meaning").unwrap());
        assert!(!form.toggle("meaning").unwrap());
        assert!(matches!(form.toggle("nonsense"), Err(SubmitError::UnknownCategory(_))));

        assert_eq!(form.set_severity(3).unwrap().label(), "Medium");
        assert!(form.set_severity(9).is_err());
        assert_eq!(form.current().unwrap().severity, 3);

        form.close();
        assert!(!form.is_open());
    }
}
