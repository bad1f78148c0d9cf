//! On-device text-to-speech port.
//!
//! Synthesizers emit word-boundary timing only while they are actually
//! synthesizing, even when the utterance volume is zero. The playback engine
//! relies on that to drive highlighting for externally rendered audio.

use serde::{Deserialize, Serialize};

use super::CapabilityError;
use crate::domain::LanguageTag;

/// A single request to speak text.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak. Boundary offsets refer to this string.
    pub text: String,

    /// Language the text is written in.
    pub language: LanguageTag,

    /// Voice identifier from [`SpeechSynthesizer::voices`], or `None` for the
    /// platform default.
    pub voice: Option<String>,

    /// Rate multiplier (1.0 = normal).
    pub rate: f32,

    /// Output volume (0.0 = silent, 1.0 = full).
    pub volume: f32,
}

impl Utterance {
    /// Full-volume, normal-rate utterance with the default voice.
    pub fn new(text: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            text: text.into(),
            language,
            voice: None,
            rate: 1.0,
            volume: 1.0,
        }
    }

    /// Whether the utterance produces no audible output.
    pub fn is_muted(&self) -> bool {
        self.volume <= 0.0
    }
}

/// Progress reported for an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    /// Synthesis began.
    Started,

    /// A word starts at `offset` (UTF-8 byte offset into [`Utterance::text`]).
    WordBoundary { offset: usize },

    /// The utterance finished or was cancelled.
    Ended,

    /// The utterance could not be spoken.
    Failed(String),
}

/// Callback receiving [`UtteranceEvent`]s. Must not block.
pub type UtteranceListener = Box<dyn Fn(UtteranceEvent) + Send + Sync + 'static>;

/// A voice the synthesizer can speak with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisVoice {
    /// Identifier passed back in [`Utterance::voice`].
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Locale the voice speaks (e.g. `ta-IN`).
    pub language: String,

    /// Whether the platform marks this as its default voice.
    pub is_default: bool,
}

/// Platform speech synthesis.
///
/// `pause`, `resume`, and `cancel` act on utterances issued through this
/// instance only.
pub trait SpeechSynthesizer: Send + Sync {
    /// Voices currently known. May be empty while the platform is still
    /// enumerating.
    fn voices(&self) -> Vec<SynthesisVoice>;

    /// Queue `utterance` and report its progress to `listener`.
    fn speak(&self, utterance: Utterance, listener: UtteranceListener) -> Result<(), CapabilityError>;

    /// Pause the current utterance.
    fn pause(&self);

    /// Resume a paused utterance.
    fn resume(&self);

    /// Drop the current and queued utterances.
    fn cancel(&self);
}
