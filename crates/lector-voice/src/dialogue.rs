//! Single-turn conversational loop on top of [`RecognitionSupervisor`].
//!
//! Each final transcript holds the supervisor, goes to the responder, and the
//! reply is spoken. When speaking finishes the supervisor is released and
//! listening resumes, unless the reply pointed at playable media: then the
//! loop stays held ([`DialogueStatus::AwaitingUser`]) so the microphone does
//! not pick up the media playback. The user re-engages with
//! [`SupervisorHandle::release`](crate::supervisor::SupervisorHandle::release).
//!
//! [`RecognitionSupervisor`]: crate::supervisor::RecognitionSupervisor

use std::sync::Arc;

use lector_core::{DialogueStatus, LanguageTag, ResponseMode, TextResponder};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::media::{detect_media, strip_media_references};
use crate::player::PlaybackHandle;
use crate::supervisor::{Dispatch, SupervisorControl, Transcript, TranscriptHandler};

/// Spoken when the responder fails.
pub const APOLOGY: &str = "I'm sorry, I encountered an error and can't answer right now.";

/// Transcript handler for the dialogue loop.
pub struct DialogueHandler {
    responder: Arc<dyn TextResponder>,
    speaker: PlaybackHandle,
    mode: ResponseMode,
    status_tx: Arc<watch::Sender<DialogueStatus>>,
    turn: Option<JoinHandle<()>>,
}

impl DialogueHandler {
    pub fn new(responder: Arc<dyn TextResponder>, speaker: PlaybackHandle, mode: ResponseMode) -> Self {
        let (status_tx, _) = watch::channel(DialogueStatus::Idle);
        Self {
            responder,
            speaker,
            mode,
            status_tx: Arc::new(status_tx),
            turn: None,
        }
    }

    /// Subscribe to dialogue status changes.
    pub fn subscribe(&self) -> watch::Receiver<DialogueStatus> {
        self.status_tx.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> DialogueStatus {
        self.status_tx.borrow().clone()
    }
}

impl TranscriptHandler for DialogueHandler {
    fn handle(&mut self, transcript: Transcript<'_>, control: &SupervisorControl) -> Dispatch {
        if let Some(turn) = self.turn.take() {
            if !turn.is_finished() {
                tracing::debug!("Abandoning previous dialogue turn");
                turn.abort();
            }
        }

        let turn = Turn {
            prompt: transcript.raw.to_string(),
            language: transcript.language.clone(),
            mode: self.mode,
            responder: Arc::clone(&self.responder),
            speaker: self.speaker.clone(),
            status_tx: Arc::clone(&self.status_tx),
            control: control.clone(),
        };
        self.turn = Some(tokio::spawn(turn.run()));

        Dispatch::Hold
    }
}

impl Drop for DialogueHandler {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.abort();
        }
    }
}

/// One question and answer.
struct Turn {
    prompt: String,
    language: LanguageTag,
    mode: ResponseMode,
    responder: Arc<dyn TextResponder>,
    speaker: PlaybackHandle,
    status_tx: Arc<watch::Sender<DialogueStatus>>,
    control: SupervisorControl,
}

impl Turn {
    async fn run(self) {
        self.status_tx.send_replace(DialogueStatus::Thinking {
            prompt: self.prompt.clone(),
        });

        let reply = match self.responder.respond(&self.prompt, self.mode).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Responder failed");
                APOLOGY.to_string()
            }
        };

        let media = detect_media(&reply);
        let spoken = if media.is_some() {
            strip_media_references(&reply)
        } else {
            reply
        };

        self.status_tx.send_replace(DialogueStatus::Speaking {
            reply: spoken.clone(),
        });

        if !spoken.trim().is_empty() {
            if let Err(e) = self.speaker.speak_to_end(spoken, &self.language, None).await {
                tracing::warn!(error = %e, "Could not speak reply");
            }
        }

        match media {
            Some(media) => {
                tracing::info!(url = %media.url, kind = ?media.kind, "Reply has media; waiting for the user");
                self.status_tx.send_replace(DialogueStatus::AwaitingUser { media_url: media.url });
            }
            None => {
                self.status_tx.send_replace(DialogueStatus::Idle);
                self.control.release();
            }
        }
    }
}
