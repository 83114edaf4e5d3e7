//! Core review logic.
//!
//! This module contains:
//! - AnnotationCache: Judgments keyed by stable id, indexed by legacy key
//! - Navigator: Traversal order and cursor
//! - AnnotationForm: Input validation and submission
//! - Session: Owns the above and dispatches UI events

pub mod cache;
pub mod form;
pub mod navigator;
pub mod session;

// Re-export commonly used types
pub use cache::AnnotationCache;
pub use form::{build_judgment, build_payload, submit, Ack, AnnotationForm, OpenForm, SubmitError, SubmitRequest};
pub use navigator::{Direction, Navigator};
pub use session::{EventOutcome, Session, SessionOptions, UiEvent};
