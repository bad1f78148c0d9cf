//! Main commands enum and primary subcommands.
//!
//! This module defines the available commands for the CLI tool.

use std::path::PathBuf;

use clap::Subcommand;
use lector_core::LanguageTag;

/// Available commands for the lector speech tool.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read text aloud with word-by-word highlighting
    Speak {
        /// Text to read
        text: String,
        /// Language of the text (e.g. "en-US", "ta-IN")
        #[arg(short, long, env = "LECTOR_LANGUAGE")]
        lang: Option<LanguageTag>,
        /// Pre-rendered PCM16 audio to play instead of the synthesizer's voice
        #[arg(long, value_name = "FILE")]
        audio: Option<PathBuf>,
        /// The audio file holds base64 text rather than raw bytes
        #[arg(long, requires = "audio")]
        base64: bool,
        /// Sample rate of the rendered audio
        #[arg(long, env = "LECTOR_RENDERED_SAMPLE_RATE")]
        sample_rate: Option<u32>,
        /// Channel count of the rendered audio
        #[arg(long, env = "LECTOR_RENDERED_CHANNELS")]
        channels: Option<u16>,
    },

    /// Control a reading by voice commands typed on stdin
    ///
    /// Each line is treated as a final transcript. Lines starting with `!`
    /// simulate a recognition error code (e.g. `!network`, `!not-allowed`).
    Listen {
        /// Command language (e.g. "en-US", "ta-IN")
        #[arg(short, long, env = "LECTOR_LANGUAGE")]
        lang: Option<LanguageTag>,
        /// Text file the "read" command reads aloud
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Talk to the local echo responder, one stdin line per utterance
    ///
    /// An empty line re-engages listening after a media reply.
    Chat {
        /// Conversation language
        #[arg(short, long, env = "LECTOR_LANGUAGE")]
        lang: Option<LanguageTag>,
        /// Ask for slower, deliberate answers
        #[arg(long)]
        thinking: bool,
    },
}
