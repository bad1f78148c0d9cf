//! Speak command handler.
//!
//! Reads one text aloud with highlighting. With `--audio`, the rendered clip
//! is played through the default output device and a muted utterance times
//! the highlights.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lector_core::{AudioBackend, PcmFormat};
use lector_voice::{PlaybackOutcome, RenderedAudio, RodioBackend};
use tokio::sync::mpsc;

use crate::adapters::ConsoleSynthesizer;
use crate::bootstrap::{CliConfig, spawn_player};
use crate::error::CliError;
use crate::presentation::{EventPrinter, spawn_playback_events};

/// Arguments for the speak command.
#[derive(Debug, Clone)]
pub struct SpeakArgs {
    pub text: String,
    pub audio: Option<std::path::PathBuf>,
    pub base64: bool,
}

/// Load rendered PCM16 audio from `path`.
pub async fn load_rendered(path: &Path, base64: bool, format: PcmFormat) -> Result<RenderedAudio, CliError> {
    if base64 {
        let encoded = tokio::fs::read_to_string(path).await?;
        Ok(RenderedAudio::from_base64(&encoded, format)?)
    } else {
        let bytes = tokio::fs::read(path).await?;
        Ok(RenderedAudio::new(bytes, format))
    }
}

/// Execute the speak command.
///
/// Returns how the reading ended. Ctrl+C stops it.
pub async fn execute(config: &CliConfig, args: SpeakArgs, printer: EventPrinter) -> Result<PlaybackOutcome> {
    let rendered = match &args.audio {
        Some(path) => Some(
            load_rendered(path, args.base64, config.pcm_format())
                .await
                .with_context(|| format!("Failed to load audio from {}", path.display()))?,
        ),
        None => None,
    };
    let backend = rendered
        .as_ref()
        .map(|_| Arc::new(RodioBackend) as Arc<dyn AudioBackend>);

    let player = spawn_player(Arc::new(ConsoleSynthesizer::new()), backend, config.playback());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let bridge = spawn_playback_events(player.subscribe(), Some(Arc::from(args.text.as_str())), events_tx);
    let printing = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            printer.print(&event);
        }
    });

    let language = config.language();
    let outcome = tokio::select! {
        outcome = player.speak_to_end(args.text.as_str(), &language, rendered) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            player.stop()?;
            PlaybackOutcome::Interrupted
        }
    };

    player.shutdown().await?;
    // Both end once the engine is gone.
    let _ = bridge.await;
    let _ = printing.await;

    if outcome == PlaybackOutcome::Interrupted {
        printer.note("Reading did not finish.");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn raw_audio_is_read_as_is() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 1, 0]).unwrap();

        let audio = load_rendered(file.path(), false, PcmFormat::default()).await.unwrap();

        assert_eq!(audio.bytes(), [0_u8, 0, 1, 0]);
        assert_eq!(audio.format(), PcmFormat::default());
    }

    #[tokio::test]
    async fn base64_audio_is_decoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "AAABAA==").unwrap();
        let format = PcmFormat {
            sample_rate: 16_000,
            channels: 2,
        };

        let audio = load_rendered(file.path(), true, format).await.unwrap();

        assert_eq!(audio.bytes(), [0_u8, 0, 1, 0]);
        assert_eq!(audio.format(), format);
    }

    #[tokio::test]
    async fn bad_base64_is_an_audio_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not base64!").unwrap();

        let err = load_rendered(file.path(), true, PcmFormat::default()).await.unwrap_err();

        assert!(matches!(err, CliError::Audio(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load_rendered(Path::new("/nonexistent/clip.pcm"), false, PcmFormat::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 74);
    }
}
