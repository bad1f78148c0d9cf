//! In-memory capability fakes shared by the integration tests.
//!
//! Each fake records what the engine asked of it and lets the test fire the
//! platform callbacks by hand, so every interleaving is scripted.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lector_core::{
    AudioBackend, AudioBuffer, AudioContext, CapabilityError, LanguageTag, OutputNode, PcmFormat,
    PlaybackDoneCallback, RecognitionChannel, RecognitionConfig, RecognitionEvent,
    RecognitionListener, SpeechRecognizer, SpeechSynthesizer, SynthesisVoice, Utterance,
    UtteranceEvent, UtteranceListener,
};
use lector_voice::{RenderedAudio, decode_pcm16};

// ── Synthesizer ────────────────────────────────────────────────────

#[derive(Default)]
struct SynthState {
    spoken: Vec<Utterance>,
    listeners: Vec<Arc<UtteranceListener>>,
    voices: Vec<SynthesisVoice>,
    fail_speak: bool,
}

/// Records utterances; optionally plays them to the end instantly.
#[derive(Default)]
pub struct FakeSynth {
    state: Mutex<SynthState>,
    auto_complete: bool,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl FakeSynth {
    /// Utterances only progress when the test fires events.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every utterance reports each word and ends during `speak`.
    pub fn auto_completing() -> Arc<Self> {
        Arc::new(Self {
            auto_complete: true,
            ..Self::default()
        })
    }

    pub fn set_voices(&self, voices: Vec<SynthesisVoice>) {
        self.state.lock().unwrap().voices = voices;
    }

    pub fn fail_speaking(&self, fail: bool) {
        self.state.lock().unwrap().fail_speak = fail;
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.state.lock().unwrap().spoken.clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken().into_iter().map(|u| u.text).collect()
    }

    /// Fire `event` for the `index`-th utterance.
    pub fn emit(&self, index: usize, event: UtteranceEvent) {
        let listener = Arc::clone(&self.state.lock().unwrap().listeners[index]);
        listener(event);
    }

    /// Fire `event` for the most recent utterance.
    pub fn emit_last(&self, event: UtteranceEvent) {
        let count = self.state.lock().unwrap().listeners.len();
        self.emit(count - 1, event);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl SpeechSynthesizer for FakeSynth {
    fn voices(&self) -> Vec<SynthesisVoice> {
        self.state.lock().unwrap().voices.clone()
    }

    fn speak(&self, utterance: Utterance, listener: UtteranceListener) -> Result<(), CapabilityError> {
        let listener = Arc::new(listener);
        let text = utterance.text.clone();
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_speak {
                return Err(CapabilityError::Playback("synthesizer refused".into()));
            }
            state.spoken.push(utterance);
            state.listeners.push(Arc::clone(&listener));
        }

        if self.auto_complete {
            listener(UtteranceEvent::Started);
            let mut offset = 0;
            for word in text.split(' ') {
                if !word.is_empty() {
                    listener(UtteranceEvent::WordBoundary { offset });
                }
                offset += word.len() + 1;
            }
            listener(UtteranceEvent::Ended);
        }
        Ok(())
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn voice(id: &str, language: &str, is_default: bool) -> SynthesisVoice {
    SynthesisVoice {
        id: id.to_string(),
        name: id.to_string(),
        language: language.to_string(),
        is_default,
    }
}

// ── Rendered audio ─────────────────────────────────────────────────

/// What happened to one output node.
#[derive(Default)]
pub struct NodeProbe {
    pub suspended: AtomicBool,
    pub stopped: AtomicBool,
    pub suspends: AtomicUsize,
    pub resumes: AtomicUsize,
}

struct FakeNode(Arc<NodeProbe>);

impl OutputNode for FakeNode {
    fn suspend(&self) {
        self.0.suspended.store(true, Ordering::SeqCst);
        self.0.suspends.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.0.suspended.store(false, Ordering::SeqCst);
        self.0.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct AudioFaults {
    pub fail_open: AtomicBool,
    pub fail_decode: AtomicBool,
    pub fail_play: AtomicBool,
}

/// Context that decodes real PCM16 and hands out probed nodes.
pub struct FakeContext {
    faults: Arc<AudioFaults>,
    closed: AtomicBool,
    nodes: Mutex<Vec<Arc<NodeProbe>>>,
    endings: Mutex<Vec<Option<PlaybackDoneCallback>>>,
}

impl FakeContext {
    pub fn node(&self, index: usize) -> Arc<NodeProbe> {
        Arc::clone(&self.nodes.lock().unwrap()[index])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    /// Fire the `index`-th node's completion callback, stopped or not.
    pub fn finish(&self, index: usize) {
        let callback = self.endings.lock().unwrap()[index].take();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioContext for FakeContext {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn decode(&self, bytes: Vec<u8>, format: PcmFormat) -> Result<AudioBuffer, CapabilityError> {
        if self.faults.fail_decode.load(Ordering::SeqCst) {
            return Err(CapabilityError::Decode("corrupt audio".into()));
        }
        decode_pcm16(&bytes, format).map_err(CapabilityError::from)
    }

    fn play(&self, _buffer: AudioBuffer, on_ended: PlaybackDoneCallback) -> Result<Box<dyn OutputNode>, CapabilityError> {
        if self.faults.fail_play.load(Ordering::SeqCst) {
            return Err(CapabilityError::Playback("device busy".into()));
        }
        let probe = Arc::new(NodeProbe::default());
        self.nodes.lock().unwrap().push(Arc::clone(&probe));
        self.endings.lock().unwrap().push(Some(on_ended));
        Ok(Box::new(FakeNode(probe)))
    }
}

/// Backend that remembers every context it opened.
#[derive(Default)]
pub struct FakeBackend {
    pub faults: Arc<AudioFaults>,
    contexts: Mutex<Vec<Arc<FakeContext>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    pub fn context(&self, index: usize) -> Arc<FakeContext> {
        Arc::clone(&self.contexts.lock().unwrap()[index])
    }

    pub fn last_context(&self) -> Arc<FakeContext> {
        let contexts = self.contexts.lock().unwrap();
        Arc::clone(contexts.last().unwrap())
    }
}

impl AudioBackend for FakeBackend {
    fn open(&self) -> Result<Arc<dyn AudioContext>, CapabilityError> {
        if self.faults.fail_open.load(Ordering::SeqCst) {
            return Err(CapabilityError::Unavailable("no output device".into()));
        }
        let context = Arc::new(FakeContext {
            faults: Arc::clone(&self.faults),
            closed: AtomicBool::new(false),
            nodes: Mutex::new(Vec::new()),
            endings: Mutex::new(Vec::new()),
        });
        self.contexts.lock().unwrap().push(Arc::clone(&context));
        Ok(context)
    }
}

/// Half a second of 24 kHz mono silence.
pub fn rendered_clip() -> RenderedAudio {
    RenderedAudio::new(vec![0; 24_000], PcmFormat::default())
}

// ── Recognizer ─────────────────────────────────────────────────────

struct ChannelRecord {
    language: LanguageTag,
    listener: Arc<RecognitionListener>,
    stopped: Arc<AtomicBool>,
}

struct FakeChannel {
    listener: Arc<RecognitionListener>,
    stopped: Arc<AtomicBool>,
    auto_start: bool,
}

impl RecognitionChannel for FakeChannel {
    fn start(&mut self) -> Result<(), CapabilityError> {
        if self.auto_start {
            (self.listener)(RecognitionEvent::Started);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            // Platforms report the end of a stopped session too.
            (self.listener)(RecognitionEvent::Ended);
        }
    }
}

/// Recognizer whose channels are driven by the test.
#[derive(Default)]
pub struct FakeRecognizer {
    channels: Mutex<Vec<ChannelRecord>>,
    pub attempts: AtomicUsize,
    pub failing_opens: AtomicUsize,
    auto_start: bool,
    unsupported: bool,
}

impl FakeRecognizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Channels report `Started` as soon as they are started.
    pub fn auto_starting() -> Arc<Self> {
        Arc::new(Self {
            auto_start: true,
            ..Self::default()
        })
    }

    /// A platform without speech recognition.
    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            unsupported: true,
            ..Self::default()
        })
    }

    /// Channels successfully opened so far.
    pub fn opens(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    pub fn language(&self, index: usize) -> LanguageTag {
        self.channels.lock().unwrap()[index].language.clone()
    }

    pub fn is_stopped(&self, index: usize) -> bool {
        self.channels.lock().unwrap()[index].stopped.load(Ordering::SeqCst)
    }

    pub fn emit(&self, index: usize, event: RecognitionEvent) {
        let listener = Arc::clone(&self.channels.lock().unwrap()[index].listener);
        listener(event);
    }

    pub fn emit_last(&self, event: RecognitionEvent) {
        let count = self.opens();
        self.emit(count - 1, event);
    }

    pub fn say(&self, index: usize, text: &str) {
        self.emit(
            index,
            RecognitionEvent::Transcript {
                text: text.to_string(),
                is_final: true,
            },
        );
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn open(
        &self,
        config: &RecognitionConfig,
        listener: RecognitionListener,
    ) -> Result<Box<dyn RecognitionChannel>, CapabilityError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(CapabilityError::Unavailable("recognizer busy".into()));
        }

        let listener = Arc::new(listener);
        let stopped = Arc::new(AtomicBool::new(false));
        self.channels.lock().unwrap().push(ChannelRecord {
            language: config.language.clone(),
            listener: Arc::clone(&listener),
            stopped: Arc::clone(&stopped),
        });

        Ok(Box::new(FakeChannel {
            listener,
            stopped,
            auto_start: self.auto_start,
        }))
    }
}
