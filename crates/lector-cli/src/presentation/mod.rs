//! Shared CLI presentation utilities.
//!
//! This module turns engine status into [`SpeechEvent`]s and prints them,
//! either as JSON lines (`--json`) or as short human-readable lines.
//!
//! # Guidelines
//!
//! - Keep this module format-only: no engine control
//! - Status diffing lives in [`bridge`]; printing lives here

pub mod bridge;

use lector_core::{DialogueStatus, SpeechEvent};

pub use bridge::{
    playback_events, spawn_dialogue_events, spawn_playback_events, spawn_recognition_events,
};

/// Writes events and notes to stdout in the selected format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPrinter {
    json: bool,
}

impl EventPrinter {
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn print(&self, event: &SpeechEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, kind = event.kind(), "Could not serialize event"),
            }
        } else if let Some(line) = format_event(event) {
            println!("{line}");
        }
    }

    /// Free-form message for humans. Goes to stderr in JSON mode.
    pub fn note(&self, message: &str) {
        if self.json {
            eprintln!("{message}");
        } else {
            println!("{message}");
        }
    }
}

/// snake_case name of a unit-like serde enum value.
fn label<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// One display line for `event`, or `None` when there is nothing to show.
pub fn format_event(event: &SpeechEvent) -> Option<String> {
    match event {
        SpeechEvent::PlaybackStateChanged { session, state } => Some(match session {
            Some(id) => format!("[playback #{id}] {}", label(state)),
            None => format!("[playback] {}", label(state)),
        }),
        SpeechEvent::HighlightChanged { word, .. } => word.as_ref().map(|word| format!("  > {word}")),
        SpeechEvent::RecognitionStateChanged { channel, state } => {
            Some(format!("[{channel}] {}", label(state)))
        }
        SpeechEvent::CommandExecuted {
            transcript, keyword, ..
        } => Some(format!("[command] {keyword} (heard \"{transcript}\")")),
        SpeechEvent::DialogueStatusChanged { status } => Some(match status {
            DialogueStatus::Idle => "[dialogue] idle".to_string(),
            DialogueStatus::Thinking { prompt } => format!("[dialogue] thinking about \"{prompt}\""),
            DialogueStatus::Speaking { reply } => format!("[dialogue] {reply}"),
            DialogueStatus::AwaitingUser { media_url } => {
                format!("[dialogue] media: {media_url} (press Enter to keep talking)")
            }
        }),
    }
}
