//! Silent synthesizer that "speaks" by emitting word boundaries on a timer.
//!
//! Nothing is audible; the CLI shows progress through the highlight events
//! the playback engine derives from these boundaries.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use lector_core::{
    CapabilityError, SpeechSynthesizer, SynthesisVoice, Utterance, UtteranceEvent,
    UtteranceListener,
};
use lector_voice::word_starts;
use tokio::sync::watch;

/// Time spent on each word at rate 1.0.
pub const DEFAULT_WORD_DURATION: Duration = Duration::from_millis(280);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Running,
    Paused,
    Cancelled,
}

/// Timer-driven [`SpeechSynthesizer`].
///
/// One utterance runs at a time; speaking again cancels the previous one.
/// Requires a tokio runtime.
pub struct ConsoleSynthesizer {
    word_duration: Duration,
    current: Mutex<Option<watch::Sender<Flow>>>,
}

impl ConsoleSynthesizer {
    pub fn new() -> Self {
        Self::with_word_duration(DEFAULT_WORD_DURATION)
    }

    pub const fn with_word_duration(word_duration: Duration) -> Self {
        Self {
            word_duration,
            current: Mutex::new(None),
        }
    }

    fn replace_current(&self, next: Option<watch::Sender<Flow>>) -> Option<watch::Sender<Flow>> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }

    /// Move the live utterance from `from` to `to`.
    fn transition(&self, from: Flow, to: Flow) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flow) = current.as_ref() {
            flow.send_if_modified(|state| {
                let hit = *state == from;
                if hit {
                    *state = to;
                }
                hit
            });
        }
    }
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<SynthesisVoice> {
        vec![
            SynthesisVoice {
                id: "console-en".to_string(),
                name: "Console English".to_string(),
                language: "en-US".to_string(),
                is_default: true,
            },
            SynthesisVoice {
                id: "console-ta".to_string(),
                name: "Console Tamil".to_string(),
                language: "ta-IN".to_string(),
                is_default: false,
            },
        ]
    }

    fn speak(&self, utterance: Utterance, listener: UtteranceListener) -> Result<(), CapabilityError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CapabilityError::Unavailable("console synthesizer needs a tokio runtime".to_string())
        })?;

        let (flow_tx, flow_rx) = watch::channel(Flow::Running);
        if let Some(previous) = self.replace_current(Some(flow_tx)) {
            previous.send_replace(Flow::Cancelled);
        }

        let step = self.word_duration.div_f32(utterance.rate.max(0.1));
        tracing::trace!(words = word_starts(&utterance.text).count(), ?step, "Console utterance");
        runtime.spawn(narrate(utterance.text, step, flow_rx, listener));
        Ok(())
    }

    fn pause(&self) {
        self.transition(Flow::Running, Flow::Paused);
    }

    fn resume(&self) {
        self.transition(Flow::Paused, Flow::Running);
    }

    fn cancel(&self) {
        if let Some(current) = self.replace_current(None) {
            current.send_replace(Flow::Cancelled);
        }
    }
}

/// Whether the utterance may continue, waiting out a pause.
async fn proceed(flow: &mut watch::Receiver<Flow>) -> bool {
    match flow.wait_for(|state| *state != Flow::Paused).await {
        Ok(state) => *state == Flow::Running,
        Err(_) => false,
    }
}

async fn narrate(
    text: String,
    step: Duration,
    mut flow: watch::Receiver<Flow>,
    listener: UtteranceListener,
) {
    listener(UtteranceEvent::Started);

    let offsets: Vec<usize> = word_starts(&text).collect();
    for offset in offsets {
        if !proceed(&mut flow).await {
            listener(UtteranceEvent::Ended);
            return;
        }
        listener(UtteranceEvent::WordBoundary { offset });

        tokio::select! {
            () = tokio::time::sleep(step) => {}
            _ = flow.wait_for(|state| *state == Flow::Cancelled) => {
                listener(UtteranceEvent::Ended);
                return;
            }
        }
    }

    // A pause after the last word holds the end back too.
    proceed(&mut flow).await;
    listener(UtteranceEvent::Ended);
}
