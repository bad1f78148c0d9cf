//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, ValueEnum};
use lector_core::{ReadingRate, SettingsUpdate};

use crate::commands::Commands;

/// Command-line interface for the lector speech engine.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser, Debug)]
#[command(name = "lector")]
#[command(about = "Read text aloud with highlighting and control it by voice")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Speech settings overridable from flags or `LECTOR_*` environment variables.
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Reading rate for spoken playback
    #[arg(long, value_enum, env = "LECTOR_READING_RATE", global = true)]
    pub rate: Option<RateArg>,

    /// Rate of the muted timing utterance used with rendered audio
    #[arg(long, env = "LECTOR_TIMING_RATE", global = true)]
    pub timing_rate: Option<f32>,

    /// Delay before listening restarts (milliseconds)
    #[arg(long, env = "LECTOR_RESTART_DELAY_MS", global = true)]
    pub restart_delay_ms: Option<u64>,

    /// Ceiling for the restart backoff (milliseconds)
    #[arg(long, env = "LECTOR_MAX_RESTART_DELAY_MS", global = true)]
    pub max_restart_delay_ms: Option<u64>,

    /// Speak a confirmation when a voice command runs
    #[arg(
        long,
        env = "LECTOR_VOICE_FEEDBACK",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub voice_feedback: Option<bool>,

    /// Run the voice-command loop in `listen`
    #[arg(
        long,
        env = "LECTOR_VOICE_COMMANDS",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub voice_commands: Option<bool>,
}

impl SettingsArgs {
    /// Only the values that were actually given.
    pub fn to_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            reading_rate: self.rate.map(|rate| Some(rate.into())),
            timing_rate: self.timing_rate.map(Some),
            restart_delay_ms: self.restart_delay_ms.map(Some),
            max_restart_delay_ms: self.max_restart_delay_ms.map(Some),
            voice_feedback: self.voice_feedback.map(Some),
            voice_commands: self.voice_commands.map(Some),
            ..SettingsUpdate::default()
        }
    }
}

/// Reading rate as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateArg {
    Slow,
    Normal,
    Fast,
}

impl From<RateArg> for ReadingRate {
    fn from(rate: RateArg) -> Self {
        match rate {
            RateArg::Slow => Self::Slow,
            RateArg::Normal => Self::Normal,
            RateArg::Fast => Self::Fast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lector_core::LanguageTag;

    #[test]
    fn test_cli_parser_builds() {
        // Verify the CLI parser can be constructed
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["lector", "--verbose", "--json", "chat", "--rate", "fast"]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert_eq!(cli.settings.rate, Some(RateArg::Fast));
    }

    #[test]
    fn test_speak_args() {
        let cli = Cli::parse_from([
            "lector",
            "speak",
            "Hello there",
            "--lang",
            "ta-IN",
            "--audio",
            "clip.b64",
            "--base64",
            "--sample-rate",
            "16000",
        ]);
        let Some(Commands::Speak {
            text,
            lang,
            audio,
            base64,
            sample_rate,
            ..
        }) = cli.command
        else {
            panic!("expected speak");
        };
        assert_eq!(text, "Hello there");
        assert_eq!(lang, Some(LanguageTag::tamil()));
        assert_eq!(audio.as_deref(), Some(std::path::Path::new("clip.b64")));
        assert!(base64);
        assert_eq!(sample_rate, Some(16_000));
    }

    #[test]
    fn test_base64_requires_audio() {
        let result = Cli::try_parse_from(["lector", "speak", "hi", "--base64"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_thinking_flag() {
        let cli = Cli::parse_from(["lector", "chat", "--thinking"]);
        assert!(matches!(cli.command, Some(Commands::Chat { thinking: true, .. })));
    }

    #[test]
    fn test_settings_update_only_carries_given_values() {
        let cli = Cli::parse_from([
            "lector",
            "listen",
            "--restart-delay-ms",
            "400",
            "--voice-feedback",
            "off",
        ]);
        let update = cli.settings.to_update();
        assert_eq!(update.restart_delay_ms, Some(Some(400)));
        assert_eq!(update.voice_feedback, Some(Some(false)));
        assert!(update.reading_rate.is_none());
        assert!(update.language.is_none());
    }
}
