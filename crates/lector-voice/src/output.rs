//! Rendered-audio output through `rodio`.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, the stream is confined to a dedicated OS thread
//! and every sink is created there through an [`AudioCommand`]. Sinks
//! themselves are `Send` and are handed back to the engine as output nodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use lector_core::{
    AudioBackend, AudioBuffer, AudioContext, CapabilityError, OutputNode, PcmFormat,
    PlaybackDoneCallback,
};
use rodio::{OutputStream, Sink};

use crate::error::VoiceError;
use crate::rendered::decode_pcm16;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the engine to the audio thread.
enum AudioCommand {
    /// Create a sink playing `buffer`.
    Play {
        buffer: AudioBuffer,
        reply: mpsc::Sender<Result<Arc<Sink>, VoiceError>>,
    },

    /// Shut down the audio thread, releasing the output stream.
    Shutdown,
}

// ── Backend ────────────────────────────────────────────────────────

/// Opens [`RodioContext`]s on the default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioBackend;

impl RodioBackend {
    pub const fn new() -> Self {
        Self
    }
}

impl AudioBackend for RodioBackend {
    fn open(&self) -> Result<Arc<dyn AudioContext>, CapabilityError> {
        let context = RodioContext::spawn().map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        Ok(Arc::new(context))
    }
}

// ── Context ────────────────────────────────────────────────────────

/// Audio context backed by a dedicated output thread.
pub struct RodioContext {
    cmd_tx: mpsc::Sender<AudioCommand>,
    closed: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioContext {
    /// Spawn the audio thread and open the default output device on it.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();
        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);

        let thread = thread::Builder::new()
            .name("lector-audio".into())
            .spawn(move || {
                Self::run(&cmd_rx, &init_tx);
                closed_flag.store(true, Ordering::SeqCst);
            })
            .map_err(|e| VoiceError::OutputStreamError(format!("failed to spawn audio thread: {e}")))?;

        // Wait for the audio thread to finish initialisation.
        init_rx.recv().map_err(|_| VoiceError::AudioThreadDied)??;

        tracing::info!("Audio output initialized on default device");

        Ok(Self {
            cmd_tx,
            closed,
            thread: Some(thread),
        })
    }

    /// Audio thread body. Owns the `!Send` output stream.
    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), VoiceError>>) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                let _ = init_tx.send(Err(VoiceError::OutputStreamError(e.to_string())));
                return;
            }
        };
        let _ = init_tx.send(Ok(()));

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Play { buffer, reply } => {
                    let result = Sink::try_new(&handle)
                        .map(|sink| {
                            sink.append(rodio::buffer::SamplesBuffer::new(
                                buffer.channels,
                                buffer.sample_rate,
                                buffer.samples,
                            ));
                            Arc::new(sink)
                        })
                        .map_err(|e| VoiceError::OutputStreamError(e.to_string()));
                    let _ = reply.send(result);
                }
                AudioCommand::Shutdown => break,
            }
        }

        // The output stream is dropped here, on the audio thread.
        tracing::debug!("Audio thread shutting down");
    }
}

#[async_trait]
impl AudioContext for RodioContext {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn decode(&self, bytes: Vec<u8>, format: PcmFormat) -> Result<AudioBuffer, CapabilityError> {
        decode_pcm16(&bytes, format).map_err(CapabilityError::from)
    }

    fn play(&self, buffer: AudioBuffer, on_ended: PlaybackDoneCallback) -> Result<Box<dyn OutputNode>, CapabilityError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Play { buffer, reply: tx })
            .map_err(|_| CapabilityError::from(VoiceError::AudioThreadDied))?;
        // Blocks the caller until the audio thread has built the sink; it
        // replies without waiting on playback. Not block_in_place: that
        // panics on a current-thread runtime.
        let sink = rx
            .recv()
            .map_err(|_| CapabilityError::from(VoiceError::AudioThreadDied))?
            .map_err(CapabilityError::from)?;

        let node = SinkNode {
            sink,
            finished: Arc::new(AtomicBool::new(false)),
        };
        node.spawn_completion_watcher(on_ended);
        tracing::debug!("Rendered audio playback started");
        Ok(Box::new(node))
    }
}

impl Drop for RodioContext {
    fn drop(&mut self) {
        // Best-effort shutdown; the thread may already be dead.
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

// ── Output node ────────────────────────────────────────────────────

/// One rendered clip playing on a `rodio` sink.
struct SinkNode {
    sink: Arc<Sink>,
    /// Set by whichever of natural end or `stop` happens first.
    finished: Arc<AtomicBool>,
}

impl SinkNode {
    /// Block a helper thread until the sink drains; fire `on_ended` only if
    /// `stop` did not get there first.
    fn spawn_completion_watcher(&self, on_ended: PlaybackDoneCallback) {
        let sink = Arc::clone(&self.sink);
        let finished = Arc::clone(&self.finished);

        thread::spawn(move || {
            sink.sleep_until_end();

            if finished.swap(true, Ordering::SeqCst) {
                return;
            }

            tracing::debug!("Rendered audio finished naturally");
            on_ended();
        });
    }
}

impl OutputNode for SinkNode {
    fn suspend(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }

    fn stop(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.sink.stop();
    }
}
