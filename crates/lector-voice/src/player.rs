//! Actor wrapper that runs a [`PlaybackEngine`] on a tokio task.
//!
//! The task owns the engine and is the only place its state changes: caller
//! commands and capability signals are consumed from two channels by one
//! `select!` loop, so they are applied strictly one at a time.
//!
//! [`PlaybackHandle`] is the cheap, cloneable `Send + Sync` proxy.

use lector_core::{LanguageTag, PlaybackState, ReadingRate};
use tokio::sync::{mpsc, oneshot, watch};

use crate::engine::{PlaybackEngine, PlaybackStatus};
use crate::error::VoiceError;
use crate::rendered::RenderedAudio;
use crate::session::{SessionId, SessionSignal};

// ── Commands ───────────────────────────────────────────────────────

enum PlayerCommand {
    Speak {
        text: String,
        language: LanguageTag,
        rendered: Option<RenderedAudio>,
        reply: Option<oneshot::Sender<Option<SessionId>>>,
    },
    Pause,
    Resume,
    Stop,
    SetReadingRate(ReadingRate),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// How a session started by [`PlaybackHandle::speak_to_end`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The authoritative source played to its end (or there was nothing to say).
    Completed,
    /// The session was stopped, superseded, or produced no audio.
    Interrupted,
}

// ── Handle ─────────────────────────────────────────────────────────

/// `Send + Sync` handle to a running playback engine.
#[derive(Clone)]
pub struct PlaybackHandle {
    cmd_tx: mpsc::UnboundedSender<PlayerCommand>,
    status_rx: watch::Receiver<PlaybackStatus>,
}

impl PlaybackHandle {
    /// Move `engine` onto a new task and return its handle.
    ///
    /// `signals` is the receiver returned alongside the engine by
    /// [`PlaybackEngine::new`]. Must be called inside a tokio runtime.
    pub fn spawn(engine: PlaybackEngine, signals: mpsc::UnboundedReceiver<SessionSignal>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let status_rx = engine.subscribe();

        tokio::spawn(run(engine, cmd_rx, signals));

        Self { cmd_tx, status_rx }
    }

    /// Start speaking `text`, replacing whatever is playing.
    pub fn speak(
        &self,
        text: impl Into<String>,
        language: &LanguageTag,
        rendered: Option<RenderedAudio>,
    ) -> Result<(), VoiceError> {
        self.send(PlayerCommand::Speak {
            text: text.into(),
            language: language.clone(),
            rendered,
            reply: None,
        })
    }

    /// Start speaking and return the new session id (`None` for empty text).
    pub async fn start(
        &self,
        text: impl Into<String>,
        language: &LanguageTag,
        rendered: Option<RenderedAudio>,
    ) -> Result<Option<SessionId>, VoiceError> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Speak {
            text: text.into(),
            language: language.clone(),
            rendered,
            reply: Some(tx),
        })?;
        rx.await.map_err(|_| VoiceError::EngineClosed)
    }

    /// Speak `text` and wait until that session is no longer playing or paused.
    pub async fn speak_to_end(
        &self,
        text: impl Into<String>,
        language: &LanguageTag,
        rendered: Option<RenderedAudio>,
    ) -> Result<PlaybackOutcome, VoiceError> {
        let mut status = self.status_rx.clone();
        let Some(id) = self.start(text, language, rendered).await? else {
            return Ok(PlaybackOutcome::Completed);
        };

        loop {
            {
                let current = status.borrow_and_update();
                if current.session != Some(id) {
                    return Ok(PlaybackOutcome::Interrupted);
                }
                match current.state {
                    PlaybackState::Completed => return Ok(PlaybackOutcome::Completed),
                    PlaybackState::Idle => return Ok(PlaybackOutcome::Interrupted),
                    PlaybackState::Playing | PlaybackState::Paused => {}
                }
            }
            if status.changed().await.is_err() {
                return Err(VoiceError::EngineClosed);
            }
        }
    }

    pub fn pause(&self) -> Result<(), VoiceError> {
        self.send(PlayerCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), VoiceError> {
        self.send(PlayerCommand::Resume)
    }

    pub fn stop(&self) -> Result<(), VoiceError> {
        self.send(PlayerCommand::Stop)
    }

    /// Change the rate for subsequent spoken sessions.
    pub fn set_reading_rate(&self, rate: ReadingRate) -> Result<(), VoiceError> {
        self.send(PlayerCommand::SetReadingRate(rate))
    }

    /// Latest published status.
    pub fn status(&self) -> PlaybackStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_rx.clone()
    }

    /// Dispose the engine and wait for its task to exit.
    pub async fn shutdown(&self) -> Result<(), VoiceError> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Shutdown { reply: tx })?;
        rx.await.map_err(|_| VoiceError::EngineClosed)
    }

    fn send(&self, cmd: PlayerCommand) -> Result<(), VoiceError> {
        self.cmd_tx.send(cmd).map_err(|_| VoiceError::EngineClosed)
    }
}

// ── Task ───────────────────────────────────────────────────────────

async fn run(
    mut engine: PlaybackEngine,
    mut commands: mpsc::UnboundedReceiver<PlayerCommand>,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
) {
    tracing::debug!("Playback task started");

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    // Every handle is gone.
                    break;
                };
                match cmd {
                    PlayerCommand::Speak { text, language, rendered, reply } => {
                        let id = engine.speak(&text, &language, rendered);
                        if let Some(reply) = reply {
                            let _ = reply.send(id);
                        }
                    }
                    PlayerCommand::Pause => {
                        engine.pause();
                    }
                    PlayerCommand::Resume => {
                        engine.resume();
                    }
                    PlayerCommand::Stop => engine.stop(),
                    PlayerCommand::SetReadingRate(rate) => engine.set_reading_rate(rate),
                    PlayerCommand::Shutdown { reply } => {
                        engine.dispose();
                        let _ = reply.send(());
                        break;
                    }
                }
            }
            Some(signal) = signals.recv() => engine.handle_signal(signal),
        }
    }

    engine.dispose();
    tracing::debug!("Playback task exited");
}
