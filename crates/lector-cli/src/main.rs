//! CLI entry point - the composition root.
//!
//! Loads `.env`, parses arguments, installs logging, resolves settings, and
//! dispatches to a handler. Errors are mapped to sysexits-style exit codes.

use clap::{CommandFactory, Parser};
use lector_core::SettingsUpdate;

use lector_cli::handlers::{chat, listen, speak};
use lector_cli::presentation::EventPrinter;
use lector_cli::{Cli, CliConfig, CliError, Commands, init_logging};

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads LECTOR_* values
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        eprintln!("Error: {e:#}");
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let printer = EventPrinter::new(cli.json);
    let mut update = cli.settings.to_update();

    match command {
        Commands::Speak {
            text,
            lang,
            audio,
            base64,
            sample_rate,
            channels,
        } => {
            update.language = lang.map(Some);
            update.rendered_sample_rate = sample_rate.map(Some);
            update.rendered_channels = channels.map(Some);
            let config = resolve(&update)?;
            speak::execute(&config, speak::SpeakArgs { text, audio, base64 }, printer).await?;
        }
        Commands::Listen { lang, file } => {
            update.language = lang.map(Some);
            let config = resolve(&update)?;
            listen::execute(&config, file, printer).await?;
        }
        Commands::Chat { lang, thinking } => {
            update.language = lang.map(Some);
            let config = resolve(&update)?;
            chat::execute(&config, thinking, printer).await?;
        }
    }

    Ok(())
}

fn resolve(update: &SettingsUpdate) -> Result<CliConfig, CliError> {
    let config = CliConfig::resolve(update)?;
    tracing::debug!(settings = ?config.settings, "Resolved settings");
    Ok(config)
}
