//! Canonical event union for everything the speech engine reports outward.
//!
//! Adapters (CLI printers, UI bridges) subscribe to engine status and map
//! changes into [`SpeechEvent`]s.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "highlight_changed", "session": 3, "span": { "startIndex": 0, "endIndex": 5 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{DialogueStatus, HighlightSpan, LanguageTag, PlaybackState, RecognitionState};

/// Canonical event types for all adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// The playback engine changed state.
    PlaybackStateChanged {
        /// Session the state belongs to, if any.
        session: Option<u64>,
        /// New state.
        state: PlaybackState,
    },

    /// The highlighted word changed. `span: null` clears the highlight.
    HighlightChanged {
        /// Session whose text the span indexes.
        session: Option<u64>,
        /// New span.
        span: Option<HighlightSpan>,
        /// The highlighted word, for adapters that do not keep the text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word: Option<String>,
    },

    /// A recognition loop changed state.
    RecognitionStateChanged {
        /// Which loop (`"commands"` or `"dialogue"`).
        channel: String,
        /// New state.
        state: RecognitionState,
    },

    /// A voice command matched and ran.
    CommandExecuted {
        /// The normalized transcript.
        transcript: String,
        /// The keyword that matched.
        keyword: String,
        /// Language of the command table.
        language: LanguageTag,
    },

    /// The dialogue loop changed status.
    DialogueStatusChanged {
        /// New status.
        #[serde(flatten)]
        status: DialogueStatus,
    },
}

impl SpeechEvent {
    /// Short, stable name of the event type.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlaybackStateChanged { .. } => "playback_state_changed",
            Self::HighlightChanged { .. } => "highlight_changed",
            Self::RecognitionStateChanged { .. } => "recognition_state_changed",
            Self::CommandExecuted { .. } => "command_executed",
            Self::DialogueStatusChanged { .. } => "dialogue_status_changed",
        }
    }
}
