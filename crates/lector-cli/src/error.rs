//! CLI-specific error types and mappings.
//!
//! This module provides error types for the CLI adapter and mappings
//! from library errors to exit codes and user-facing messages.

use lector_core::SettingsError;
use lector_voice::VoiceError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Speech engine error.
    #[error("{0}")]
    Engine(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio output or decoding error.
    #[error("Audio error: {0}")]
    Audio(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Audio(_) => 69,    // EX_UNAVAILABLE
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<VoiceError> for CliError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::InvalidBase64(_)
            | VoiceError::InvalidPcm(_)
            | VoiceError::OutputStreamError(_)
            | VoiceError::AudioThreadDied => Self::Audio(err.to_string()),
            VoiceError::EngineClosed | VoiceError::SupervisorClosed | VoiceError::Capability(_) => {
                Self::Engine(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
