//! Speech engine error types.

use lector_core::CapabilityError;

/// Errors that can occur in the speech engine.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The playback engine task has shut down.
    #[error("Playback engine is closed")]
    EngineClosed,

    /// The recognition supervisor task has shut down.
    #[error("Recognition supervisor is closed")]
    SupervisorClosed,

    /// Rendered audio bytes are not valid PCM for the declared format.
    #[error("Invalid PCM audio: {0}")]
    InvalidPcm(String),

    /// Rendered audio could not be base64-decoded.
    #[error("Invalid base64 audio: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// A platform capability failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Failed to open audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// The dedicated audio thread exited unexpectedly.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,
}

impl From<VoiceError> for CapabilityError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Capability(inner) => inner,
            VoiceError::InvalidPcm(msg) => Self::Decode(msg),
            VoiceError::InvalidBase64(e) => Self::Decode(e.to_string()),
            other => Self::Playback(other.to_string()),
        }
    }
}
