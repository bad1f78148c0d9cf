//! Settings domain types and validation.
//!
//! This module contains the speech settings shared by the engine and its
//! adapters. These are pure domain types with no infrastructure dependencies.

use serde::{Deserialize, Serialize};

use crate::domain::{LanguageTag, ReadingRate};

/// Default rate of the muted utterance that times highlights for rendered audio.
pub const DEFAULT_TIMING_RATE: f32 = 0.7;

/// Default delay before a recognition channel is reopened.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 250;

/// Default ceiling for the backoff applied when reopening keeps failing.
pub const DEFAULT_MAX_RESTART_DELAY_MS: u64 = 5_000;

/// Default sample rate of rendered provider audio.
pub const DEFAULT_RENDERED_SAMPLE_RATE: u32 = 24_000;

/// Application speech settings.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Language for reading, recognition, and command tables.
    pub language: Option<LanguageTag>,

    /// Rate for audible on-device reading.
    pub reading_rate: Option<ReadingRate>,

    /// Rate of the muted timing utterance used alongside rendered audio.
    pub timing_rate: Option<f32>,

    /// Delay before reopening a recognition channel (milliseconds).
    pub restart_delay_ms: Option<u64>,

    /// Backoff ceiling for repeated reopen failures (milliseconds).
    pub max_restart_delay_ms: Option<u64>,

    /// Whether matched voice commands speak their feedback phrase.
    pub voice_feedback: Option<bool>,

    /// Whether the voice-command loop is enabled.
    pub voice_commands: Option<bool>,

    /// Sample rate of rendered provider audio.
    pub rendered_sample_rate: Option<u32>,

    /// Channel count of rendered provider audio.
    pub rendered_channels: Option<u16>,
}

impl Settings {
    /// Create settings with sensible defaults.
    pub fn with_defaults() -> Self {
        Self {
            language: Some(LanguageTag::english()),
            reading_rate: Some(ReadingRate::Normal),
            timing_rate: Some(DEFAULT_TIMING_RATE),
            restart_delay_ms: Some(DEFAULT_RESTART_DELAY_MS),
            max_restart_delay_ms: Some(DEFAULT_MAX_RESTART_DELAY_MS),
            voice_feedback: Some(true),
            voice_commands: Some(true),
            rendered_sample_rate: Some(DEFAULT_RENDERED_SAMPLE_RATE),
            rendered_channels: Some(1),
        }
    }

    /// Get the effective language (with default fallback).
    pub fn effective_language(&self) -> LanguageTag {
        self.language.clone().unwrap_or_default()
    }

    /// Get the effective reading rate.
    pub fn effective_reading_rate(&self) -> ReadingRate {
        self.reading_rate.unwrap_or_default()
    }

    /// Get the effective timing-utterance rate.
    pub fn effective_timing_rate(&self) -> f32 {
        self.timing_rate.unwrap_or(DEFAULT_TIMING_RATE)
    }

    /// Get the effective restart delay.
    pub fn effective_restart_delay_ms(&self) -> u64 {
        self.restart_delay_ms.unwrap_or(DEFAULT_RESTART_DELAY_MS)
    }

    /// Get the effective backoff ceiling.
    pub fn effective_max_restart_delay_ms(&self) -> u64 {
        self.max_restart_delay_ms
            .unwrap_or(DEFAULT_MAX_RESTART_DELAY_MS)
    }

    /// Get whether command feedback is spoken.
    pub fn effective_voice_feedback(&self) -> bool {
        self.voice_feedback.unwrap_or(true)
    }

    /// Get whether the command loop is enabled.
    pub fn effective_voice_commands(&self) -> bool {
        self.voice_commands.unwrap_or(true)
    }

    /// Get the effective rendered audio sample rate.
    pub fn effective_rendered_sample_rate(&self) -> u32 {
        self.rendered_sample_rate
            .unwrap_or(DEFAULT_RENDERED_SAMPLE_RATE)
    }

    /// Get the effective rendered audio channel count.
    pub fn effective_rendered_channels(&self) -> u16 {
        self.rendered_channels.unwrap_or(1)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref language) = other.language {
            self.language.clone_from(language);
        }
        if let Some(rate) = other.reading_rate {
            self.reading_rate = rate;
        }
        if let Some(rate) = other.timing_rate {
            self.timing_rate = rate;
        }
        if let Some(delay) = other.restart_delay_ms {
            self.restart_delay_ms = delay;
        }
        if let Some(delay) = other.max_restart_delay_ms {
            self.max_restart_delay_ms = delay;
        }
        if let Some(feedback) = other.voice_feedback {
            self.voice_feedback = feedback;
        }
        if let Some(commands) = other.voice_commands {
            self.voice_commands = commands;
        }
        if let Some(rate) = other.rendered_sample_rate {
            self.rendered_sample_rate = rate;
        }
        if let Some(channels) = other.rendered_channels {
            self.rendered_channels = channels;
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub language: Option<Option<LanguageTag>>,
    pub reading_rate: Option<Option<ReadingRate>>,
    pub timing_rate: Option<Option<f32>>,
    pub restart_delay_ms: Option<Option<u64>>,
    pub max_restart_delay_ms: Option<Option<u64>>,
    pub voice_feedback: Option<Option<bool>>,
    pub voice_commands: Option<Option<bool>>,
    pub rendered_sample_rate: Option<Option<u32>>,
    pub rendered_channels: Option<Option<u16>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("Language tag cannot be empty")]
    EmptyLanguage,

    #[error("Timing rate must be between 0.1 and 1.0, got {0}")]
    InvalidTimingRate(f32),

    #[error("Restart delay must be between 50 and 10,000 ms, got {0}")]
    InvalidRestartDelay(u64),

    #[error("Max restart delay ({max}) must not be below the restart delay ({base})")]
    InvalidMaxRestartDelay { base: u64, max: u64 },

    #[error("Rendered sample rate must be between 8,000 and 192,000 Hz, got {0}")]
    InvalidSampleRate(u32),

    #[error("Rendered channel count must be 1 or 2, got {0}")]
    InvalidChannels(u16),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(ref language) = settings.language {
        if language.as_str().is_empty() {
            return Err(SettingsError::EmptyLanguage);
        }
    }

    if let Some(rate) = settings.timing_rate {
        if !(0.1..=1.0).contains(&rate) {
            return Err(SettingsError::InvalidTimingRate(rate));
        }
    }

    if let Some(delay) = settings.restart_delay_ms {
        if !(50..=10_000).contains(&delay) {
            return Err(SettingsError::InvalidRestartDelay(delay));
        }
    }

    let base = settings.effective_restart_delay_ms();
    let max = settings.effective_max_restart_delay_ms();
    if max < base {
        return Err(SettingsError::InvalidMaxRestartDelay { base, max });
    }

    if let Some(rate) = settings.rendered_sample_rate {
        if !(8_000..=192_000).contains(&rate) {
            return Err(SettingsError::InvalidSampleRate(rate));
        }
    }

    if let Some(channels) = settings.rendered_channels {
        if !(1..=2).contains(&channels) {
            return Err(SettingsError::InvalidChannels(channels));
        }
    }

    Ok(())
}
