//! Command-line front end for the lector speech engine.
//!
//! | Command | What it runs |
//! |---|---|
//! | `lector speak` | One highlighted reading, optionally over rendered PCM audio |
//! | `lector listen` | The voice-command loop controlling a reading |
//! | `lector chat` | The dialogue loop against a local echo responder |
//!
//! Microphone and voice are replaced by terminal adapters: typed lines are
//! final transcripts and the synthesizer announces words on a timer.

#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;

pub mod adapters;
pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, init_logging};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
