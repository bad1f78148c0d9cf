//! Core domain types.
//!
//! These types represent the pure speech domain model, independent of any
//! platform synthesis, recognition, or audio backend.
//!
//! # Structure
//!
//! - `language` - BCP-47 style language tags (`LanguageTag`)
//! - `highlight` - Word highlight spans into the text being read
//! - `state` - Playback and recognition state machines, reading rate

mod highlight;
mod language;
mod state;

pub use highlight::HighlightSpan;
pub use language::LanguageTag;
pub use state::{DialogueStatus, PlaybackState, ReadingRate, RecognitionState};
