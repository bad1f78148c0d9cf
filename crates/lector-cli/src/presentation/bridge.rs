//! Status-to-event bridges.
//!
//! The engines publish state through `watch` channels. These tasks diff
//! consecutive values and forward the resulting [`SpeechEvent`]s to one
//! `mpsc` stream the command loop prints from. Rapid changes may coalesce.

use std::sync::Arc;

use lector_core::{DialogueStatus, RecognitionState, SpeechEvent};
use lector_voice::PlaybackStatus;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Events describing the step from `previous` to `next`.
///
/// `text` is the session's text, used to attach the highlighted word.
pub fn playback_events(
    previous: &PlaybackStatus,
    next: &PlaybackStatus,
    text: Option<&str>,
) -> Vec<SpeechEvent> {
    let session = next.session.map(|id| id.get());
    let mut events = Vec::new();

    if next.state != previous.state || next.session != previous.session {
        events.push(SpeechEvent::PlaybackStateChanged {
            session,
            state: next.state,
        });
    }

    if next.highlight != previous.highlight {
        let word = next
            .highlight
            .zip(text)
            .and_then(|(span, text)| span.slice(text))
            .map(str::to_string);
        events.push(SpeechEvent::HighlightChanged {
            session,
            span: next.highlight,
            word,
        });
    }

    events
}

pub fn spawn_playback_events(
    mut status: watch::Receiver<PlaybackStatus>,
    text: Option<Arc<str>>,
    events: mpsc::UnboundedSender<SpeechEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous = *status.borrow_and_update();
        while status.changed().await.is_ok() {
            let next = *status.borrow_and_update();
            for event in playback_events(&previous, &next, text.as_deref()) {
                if events.send(event).is_err() {
                    return;
                }
            }
            previous = next;
        }
    })
}

pub fn spawn_recognition_events(
    channel: &str,
    mut state: watch::Receiver<RecognitionState>,
    events: mpsc::UnboundedSender<SpeechEvent>,
) -> JoinHandle<()> {
    let channel = channel.to_string();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let event = SpeechEvent::RecognitionStateChanged {
                channel: channel.clone(),
                state: *state.borrow_and_update(),
            };
            if events.send(event).is_err() {
                return;
            }
        }
    })
}

pub fn spawn_dialogue_events(
    mut status: watch::Receiver<DialogueStatus>,
    events: mpsc::UnboundedSender<SpeechEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let event = SpeechEvent::DialogueStatusChanged {
                status: status.borrow_and_update().clone(),
            };
            if events.send(event).is_err() {
                return;
            }
        }
    })
}
