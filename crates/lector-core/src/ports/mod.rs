//! Port definitions (trait abstractions) for platform capabilities.
//!
//! Ports define the interfaces the speech engine expects from the platform.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - Capabilities report progress through listener callbacks; listeners only
//!   enqueue work, they never re-enter the engine.
//! - Every handle a port returns is single-owner; the engine decides when to
//!   stop and drop it.
//! - No audio framework types (`rodio`, `cpal`, ...) in any signature.

pub mod audio;
pub mod recognition;
pub mod responder;
pub mod synthesis;

use thiserror::Error;

pub use audio::{AudioBackend, AudioBuffer, AudioContext, OutputNode, PcmFormat, PlaybackDoneCallback};
pub use recognition::{
    RecognitionChannel, RecognitionConfig, RecognitionErrorKind, RecognitionEvent,
    RecognitionListener, SpeechRecognizer,
};
pub use responder::{ResponseMode, TextResponder};
pub use synthesis::{SpeechSynthesizer, SynthesisVoice, Utterance, UtteranceEvent, UtteranceListener};

/// Errors reported by capability implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The capability does not exist on this platform.
    #[error("Capability not supported: {0}")]
    Unsupported(String),

    /// The capability exists but could not be reached or opened.
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    /// Encoded audio could not be turned into a playable buffer.
    #[error("Audio decode failed: {0}")]
    Decode(String),

    /// An output node or utterance could not be started.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// The external responder failed.
    #[error("Responder failed: {0}")]
    Responder(String),
}
