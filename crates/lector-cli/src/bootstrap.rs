//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Logging (`tracing-subscriber`, filtered by `RUST_LOG`)
//! - Settings resolution (defaults, then `LECTOR_*` env vars and flags)
//! - Playback engines on their own tasks
//!
//! Command handlers receive resolved configuration and handles.

use std::sync::Arc;

use lector_core::{
    AudioBackend, LanguageTag, PcmFormat, Settings, SettingsUpdate, SpeechSynthesizer,
    validate_settings,
};
use lector_voice::{PlaybackConfig, PlaybackEngine, PlaybackHandle, SupervisorConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::CliError;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `--verbose`.
/// Logs go to stderr so stdout stays clean for `--json` output.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init();
}

/// Resolved configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: Settings,
}

impl CliConfig {
    /// Defaults overlaid with `update`, validated.
    pub fn resolve(update: &SettingsUpdate) -> Result<Self, CliError> {
        let mut settings = Settings::with_defaults();
        settings.merge(update);
        validate_settings(&settings)?;
        Ok(Self { settings })
    }

    pub fn language(&self) -> LanguageTag {
        self.settings.effective_language()
    }

    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig::from_settings(&self.settings)
    }

    pub fn supervisor(&self, name: &str) -> SupervisorConfig {
        SupervisorConfig::from_settings(name, &self.settings)
    }

    /// Format of rendered provider audio.
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.settings.effective_rendered_sample_rate(),
            channels: self.settings.effective_rendered_channels(),
        }
    }
}

/// Start a playback engine on its own task.
pub fn spawn_player(
    synth: Arc<dyn SpeechSynthesizer>,
    backend: Option<Arc<dyn AudioBackend>>,
    config: PlaybackConfig,
) -> PlaybackHandle {
    let (engine, signals) = PlaybackEngine::new(synth, backend, config);
    PlaybackHandle::spawn(engine, signals)
}
