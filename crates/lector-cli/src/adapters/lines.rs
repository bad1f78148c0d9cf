//! Recognizer fed with typed lines instead of a microphone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lector_core::{
    CapabilityError, RecognitionChannel, RecognitionConfig, RecognitionErrorKind, RecognitionEvent,
    RecognitionListener, SpeechRecognizer,
};

/// Listener side of one channel. `Ended` is reported at most once.
struct Shared {
    id: u64,
    listener: RecognitionListener,
    ended: AtomicBool,
}

impl Shared {
    fn emit(&self, event: RecognitionEvent) {
        if !self.ended.load(Ordering::SeqCst) {
            (self.listener)(event);
        }
    }

    fn end(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            (self.listener)(RecognitionEvent::Ended);
        }
    }
}

type Slot = Arc<Mutex<Option<Arc<Shared>>>>;

/// [`SpeechRecognizer`] whose "speech" is whatever [`LineRecognizer::hear`] is
/// given. Only the most recently started channel hears anything.
#[derive(Default)]
pub struct LineRecognizer {
    live: Slot,
    next_id: AtomicU64,
}

impl LineRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> Option<Arc<Shared>> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliver `line` as a final transcript. Returns `false` when no channel
    /// is listening.
    pub fn hear(&self, line: &str) -> bool {
        let Some(channel) = self.live() else {
            return false;
        };
        channel.emit(RecognitionEvent::Transcript {
            text: line.to_string(),
            is_final: true,
        });
        true
    }

    /// Fail the listening channel with `kind`, then end it.
    pub fn fail(&self, kind: RecognitionErrorKind) -> bool {
        let taken = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(channel) = taken else {
            return false;
        };
        channel.emit(RecognitionEvent::Error(kind));
        channel.end();
        true
    }

    /// Whether a channel is currently listening.
    pub fn is_listening(&self) -> bool {
        self.live().is_some()
    }
}

impl SpeechRecognizer for LineRecognizer {
    fn open(
        &self,
        config: &RecognitionConfig,
        listener: RecognitionListener,
    ) -> Result<Box<dyn RecognitionChannel>, CapabilityError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(channel = id, language = %config.language, "Opening line channel");
        Ok(Box::new(LineChannel {
            shared: Arc::new(Shared {
                id,
                listener,
                ended: AtomicBool::new(false),
            }),
            live: Arc::clone(&self.live),
        }))
    }
}

struct LineChannel {
    shared: Arc<Shared>,
    live: Slot,
}

impl RecognitionChannel for LineChannel {
    fn start(&mut self) -> Result<(), CapabilityError> {
        let previous = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&self.shared));
        if let Some(previous) = previous {
            previous.end();
        }
        self.shared.emit(RecognitionEvent::Started);
        Ok(())
    }

    fn stop(&mut self) {
        {
            let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
            if live.as_ref().is_some_and(|current| current.id == self.shared.id) {
                live.take();
            }
        }
        self.shared.end();
    }
}
