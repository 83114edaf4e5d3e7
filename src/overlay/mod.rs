//! Text span overlay engine.
//!
//! Turns a reconstructed transcript and its error list into HTML markup in
//! which every error span is an interactive, styled element.
//!
//! # Design Decisions
//!
//! - **Original offsets**: all ranges refer to the unmodified text; splices
//!   run from the end of the text towards the start
//! - **Skip, don't fail**: malformed or overlapping ranges are left out of the
//!   overlay and counted
//! - **Escape per fragment**: every piece of interpolated text is escaped, so
//!   the output can be inserted as HTML directly
//! - **No inline handlers**: spans carry `data-*` attributes and an index into
//!   the typed target registry
//!
//! # Example
//!
//! ```ignore
//! use asr_review::overlay::render_utterance;
//!
//! let overlay = render_utterance(&utterance, &cache);
//! let clicked = overlay.target(0);
//! ```

pub mod discover;
pub mod escape;
pub mod render;

pub use discover::{count_markers, discover_markers, Marker};
pub use escape::{escape_html, unescape_html};
pub use render::{
    apply_replacements, render, render_utterance, AnnotationLookup, Overlay, RenderedSpan,
    Replacement,
};
