//! Core domain types, capability ports, and settings for the lector speech engine.
//!
//! This crate has no platform dependencies. Synthesis, recognition, audio
//! output, and the conversational responder are all reached through the
//! traits in [`ports`]; the engine in `lector-voice` is written against
//! those traits and adapters implement them.
//!
//! | Module | Contents |
//! |---|---|
//! | [`domain`] | Language tags, highlight spans, state machines, reading rate |
//! | [`events`] | [`SpeechEvent`], the serializable event union for frontends |
//! | [`ports`] | Capability traits and their data types |
//! | [`settings`] | [`Settings`], partial updates, validation |

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    DialogueStatus, HighlightSpan, LanguageTag, PlaybackState, ReadingRate, RecognitionState,
};
pub use events::SpeechEvent;
pub use ports::{
    AudioBackend, AudioBuffer, AudioContext, CapabilityError, OutputNode, PcmFormat,
    PlaybackDoneCallback, RecognitionChannel, RecognitionConfig, RecognitionErrorKind,
    RecognitionEvent, RecognitionListener, ResponseMode, SpeechRecognizer, SpeechSynthesizer,
    SynthesisVoice, TextResponder, Utterance, UtteranceEvent, UtteranceListener,
};
pub use settings::{
    DEFAULT_MAX_RESTART_DELAY_MS, DEFAULT_RENDERED_SAMPLE_RATE, DEFAULT_RESTART_DELAY_MS,
    DEFAULT_TIMING_RATE, Settings, SettingsError, SettingsUpdate, validate_settings,
};
