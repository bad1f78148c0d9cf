//! Platform speech-recognition port.
//!
//! Channels are single-shot: once a channel reports [`RecognitionEvent::Ended`]
//! it is discarded and the supervisor opens a fresh one.

use serde::{Deserialize, Serialize};

use super::CapabilityError;
use crate::domain::LanguageTag;

/// Options for opening a recognition channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Language to recognize.
    pub language: LanguageTag,

    /// Keep listening across utterances instead of stopping after the first.
    pub continuous: bool,

    /// Deliver non-final hypotheses too.
    pub interim_results: bool,
}

impl RecognitionConfig {
    /// Continuous, final-results-only recognition in `language`.
    pub fn continuous(language: LanguageTag) -> Self {
        Self {
            language,
            continuous: true,
            interim_results: false,
        }
    }
}

/// Classified recognition failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionErrorKind {
    /// Nothing was said before the silence timeout.
    NoSpeech,

    /// The session was aborted by the platform.
    Aborted,

    /// Audio could not be captured.
    AudioCapture,

    /// The recognition service could not be reached.
    Network,

    /// The user or platform denied microphone access.
    PermissionDenied,

    /// Anything else, with the platform's description.
    Other(String),
}

impl RecognitionErrorKind {
    /// Classify a Web Speech style error code (`"no-speech"`, `"not-allowed"`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether automatic restarts must stop after this error.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Progress reported by a recognition channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The channel is capturing audio.
    Started,

    /// A recognition hypothesis.
    Transcript { text: String, is_final: bool },

    /// The channel failed; an `Ended` event may or may not follow.
    Error(RecognitionErrorKind),

    /// The channel stopped and will deliver nothing else.
    Ended,
}

/// Callback receiving [`RecognitionEvent`]s. Must not block.
pub type RecognitionListener = Box<dyn Fn(RecognitionEvent) + Send + Sync + 'static>;

/// Platform speech recognition.
pub trait SpeechRecognizer: Send + Sync {
    /// Whether recognition exists on this platform at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Create a new, not-yet-started channel.
    fn open(
        &self,
        config: &RecognitionConfig,
        listener: RecognitionListener,
    ) -> Result<Box<dyn RecognitionChannel>, CapabilityError>;
}

/// One recognition attempt.
pub trait RecognitionChannel: Send {
    /// Begin capturing.
    fn start(&mut self) -> Result<(), CapabilityError>;

    /// Stop capturing. The channel may still emit `Ended` afterwards.
    fn stop(&mut self);
}
