//! State machines shared between the engine and its adapters.

use serde::{Deserialize, Serialize};

// ── Playback ───────────────────────────────────────────────────────

/// Lifecycle of the active playback session.
///
/// ```text
///   Idle ──speak──▶ Playing ◀──pause/resume──▶ Paused
///     ▲                │
///     │             (natural end)
///     └──── stop ── Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is playing.
    #[default]
    Idle,

    /// A session is producing audio.
    Playing,

    /// A session is suspended and can be resumed.
    Paused,

    /// The last session finished on its own.
    Completed,
}

impl PlaybackState {
    /// Whether a session is still in flight (playing or paused).
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

// ── Recognition ────────────────────────────────────────────────────

/// Lifecycle of a continuous recognition loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionState {
    /// Not listening and not trying to.
    #[default]
    Stopped,

    /// A channel has been opened (or is about to be) and has not reported start.
    Starting,

    /// The channel reported start and is delivering results.
    Listening,

    /// Enabled, but a handler asked the loop to stop listening for now.
    Held,

    /// The microphone permission was denied; no restarts until re-enabled.
    SuspendedByPermission,
}

// ── Dialogue ───────────────────────────────────────────────────────

/// What the conversational loop is doing, for display.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DialogueStatus {
    /// The loop has not heard anything yet.
    #[default]
    Idle,

    /// Waiting for the responder.
    Thinking {
        /// What the user said.
        prompt: String,
    },

    /// Speaking the reply.
    Speaking {
        /// The reply as spoken.
        reply: String,
    },

    /// The reply referenced playable media; listening stays off until the
    /// user re-engages.
    AwaitingUser {
        /// The detected media link.
        media_url: String,
    },
}

// ── Reading rate ───────────────────────────────────────────────────

/// User-selectable speaking rate for audible on-device synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingRate {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl ReadingRate {
    /// Synthesizer rate multiplier.
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Slow => 0.75,
            Self::Normal => 1.0,
            Self::Fast => 1.5,
        }
    }

    /// One step faster, saturating at [`ReadingRate::Fast`].
    #[must_use]
    pub const fn faster(self) -> Self {
        match self {
            Self::Slow => Self::Normal,
            Self::Normal | Self::Fast => Self::Fast,
        }
    }

    /// One step slower, saturating at [`ReadingRate::Slow`].
    #[must_use]
    pub const fn slower(self) -> Self {
        match self {
            Self::Fast => Self::Normal,
            Self::Normal | Self::Slow => Self::Slow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_playing_and_paused_are_active() {
        assert!(PlaybackState::Playing.is_active());
        assert!(PlaybackState::Paused.is_active());
        assert!(!PlaybackState::Idle.is_active());
        assert!(!PlaybackState::Completed.is_active());
    }

    #[test]
    fn reading_rate_steps_saturate() {
        assert_eq!(ReadingRate::Slow.faster(), ReadingRate::Normal);
        assert_eq!(ReadingRate::Fast.faster(), ReadingRate::Fast);
        assert_eq!(ReadingRate::Fast.slower(), ReadingRate::Normal);
        assert_eq!(ReadingRate::Slow.slower(), ReadingRate::Slow);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn reading_rate_multipliers() {
        assert_eq!(ReadingRate::Slow.multiplier(), 0.75);
        assert_eq!(ReadingRate::Normal.multiplier(), 1.0);
        assert_eq!(ReadingRate::Fast.multiplier(), 1.5);
    }
}
