//! Speech engine for lector: highlighted playback, continuous recognition,
//! voice commands, and the dialogue loop.
//!
//! | Module | Role |
//! |---|---|
//! | [`session`] | `AudioMixSession`: one playback attempt, completion authority, highlight spans |
//! | [`engine`] | `PlaybackEngine`: at-most-one-session speak/pause/resume/stop |
//! | [`player`] | `PlaybackHandle`: the engine on a tokio task |
//! | [`supervisor`] | `RecognitionSupervisor`: always-on listening with restart and backoff |
//! | [`commands`] | Command table, `match_command`, registry, dispatcher |
//! | [`dialogue`] | Responder-driven dialogue handler |
//! | [`media`] | Playable media detection in replies |
//! | [`rendered`] | Provider PCM audio and decoding |
//! | [`voices`] | Synthesis voice selection |
//! | `output` | `rodio` audio backend (feature `rodio-output`) |
//!
//! All platform capabilities come in through the traits in
//! [`lector_core::ports`].

#![deny(unused_crate_dependencies)]

pub mod commands;
pub mod dialogue;
pub mod engine;
pub mod error;
pub mod media;
#[cfg(feature = "rodio-output")]
pub mod output;
pub mod player;
pub mod rendered;
pub mod session;
pub mod supervisor;
pub mod text;
pub mod voices;

// Re-export key types for convenience
pub use commands::{
    Command, CommandDispatcher, CommandMatch, CommandRegistry, CommandScope, CommandSnapshot,
    match_command,
};
pub use dialogue::DialogueHandler;
pub use engine::{PlaybackConfig, PlaybackEngine, PlaybackStatus};
pub use error::VoiceError;
pub use media::{MediaKind, MediaReference, detect_media, strip_media_references};
#[cfg(feature = "rodio-output")]
pub use output::RodioBackend;
pub use player::{PlaybackHandle, PlaybackOutcome};
pub use rendered::{RenderedAudio, decode_pcm16};
pub use session::{AudioMixSession, CompletionAuthority, SessionId, SessionSignal};
pub use supervisor::{
    Dispatch, RecognitionSupervisor, SupervisorConfig, SupervisorControl, SupervisorHandle,
    Transcript, TranscriptHandler,
};
pub use text::{word_span_at, word_starts};

// Dev-dependencies used only by integration tests
#[cfg(all(test, not(feature = "rodio-output")))]
use async_trait as _;
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
