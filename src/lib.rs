//! asr-review - Reviewer-side annotation client for ASR transcript errors
//!
//! Renders machine-reconstructed transcripts with their DEL/SUB/INS error
//! spans highlighted, lets a reviewer classify each span with taxonomy tags
//! and a severity, and syncs those judgments with an annotation backend.
//!
//! # Architecture
//!
//! A [`Session`] owns all state for one model and is driven by typed
//! [`UiEvent`]s:
//! - The navigator picks an utterance (shuffled or in backend order)
//! - The overlay engine renders it with one interactive span per error
//! - Opening a span prefills the form from the annotation cache
//! - A submission is validated, posted, and only then cached and re-rendered
//!
//! # Modules
//!
//! - `overlay`: Span discovery, escaping and markup rendering
//! - `core`: Cache, navigator, form controller and session
//! - `domain`: Data structures (Utterance, ErrorRef, Judgment)
//! - `adapters`: Annotation backend integration (HTTP)
//! - `stats` / `export`: Progress figures and JSON export
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Interactive review
//! asr-review --model whisper review
//!
//! # Render one utterance as HTML
//! asr-review --model whisper show 3 --html utt3.html
//!
//! # Export everything annotated so far
//! asr-review --model whisper export --out ./exports
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod export;
pub mod overlay;
pub mod stats;

// Re-export main types at crate root for convenience
pub use adapters::{AnnotationApi, HttpApi};
pub use core::{AnnotationCache, Direction, EventOutcome, Navigator, Session, SessionOptions, SubmitError, UiEvent};
pub use domain::{ErrorRef, ErrorTarget, ErrorType, Judgment, Severity, TaxonomyTag, Utterance};
pub use overlay::{render_utterance, Overlay};
pub use stats::{Stats, Summary};
