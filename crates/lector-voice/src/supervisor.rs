//! Continuous recognition loop with auto-restart.
//!
//! ```text
//!   Stopped ──enable──▶ Starting ──started──▶ Listening
//!      ▲                  ▲   │                  │
//!      │                  │   └──open failed─────┤ (backoff)
//!      │                  └──── end / transient error (restart delay)
//!      │                                         │
//!      ├──── disable ◀───────────────────────────┤
//!      │                                         ├── handler holds ──▶ Held ──release──▶ Starting
//!      └──── disable ◀── SuspendedByPermission ◀─┘ permission denied
//! ```
//!
//! Recognition channels are single-use. Every channel gets a new generation
//! number and its listener tags events with it; retiring a channel (end,
//! error, hold, disable) bumps the generation, so late events and restart
//! timers from an older channel are ignored by comparison, not by flags.

use std::sync::Arc;
use std::time::Duration;

use lector_core::{
    LanguageTag, RecognitionChannel, RecognitionConfig, RecognitionErrorKind, RecognitionEvent,
    RecognitionState, Settings, SpeechRecognizer,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::VoiceError;
use crate::text::normalize_transcript;

// ── Configuration ──────────────────────────────────────────────────

/// Recognition supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Name used in logs and events (`"commands"`, `"dialogue"`).
    pub name: String,

    /// Language to recognize.
    pub language: LanguageTag,

    /// Delay before reopening after a channel ends.
    pub restart_delay: Duration,

    /// Ceiling for the backoff applied when opening keeps failing.
    pub max_restart_delay: Duration,
}

impl SupervisorConfig {
    /// Defaults: 250 ms restart delay, 5 s backoff ceiling.
    pub fn new(name: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            name: name.into(),
            language,
            restart_delay: Duration::from_millis(lector_core::DEFAULT_RESTART_DELAY_MS),
            max_restart_delay: Duration::from_millis(lector_core::DEFAULT_MAX_RESTART_DELAY_MS),
        }
    }

    /// Build from application settings.
    pub fn from_settings(name: impl Into<String>, settings: &Settings) -> Self {
        Self {
            name: name.into(),
            language: settings.effective_language(),
            restart_delay: Duration::from_millis(settings.effective_restart_delay_ms()),
            max_restart_delay: Duration::from_millis(settings.effective_max_restart_delay_ms()),
        }
    }

    /// Delay before the next attempt after `failures` consecutive open failures.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1_u32 << failures.min(16);
        self.restart_delay
            .saturating_mul(factor)
            .min(self.max_restart_delay.max(self.restart_delay))
    }
}

// ── Handler seam ───────────────────────────────────────────────────

/// What the loop does after a transcript was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep listening.
    Continue,
    /// Stop the channel and stay [`RecognitionState::Held`] until released.
    Hold,
}

/// A final transcript.
#[derive(Debug, Clone, Copy)]
pub struct Transcript<'a> {
    /// Trimmed, lowercased text for matching. Never empty.
    pub text: &'a str,
    /// Trimmed text as recognized, case preserved.
    pub raw: &'a str,
    /// Language the channel was recognizing.
    pub language: &'a LanguageTag,
}

/// Pluggable handling of final transcripts.
///
/// Called on the supervisor's task; must not block. Long work should be
/// spawned and finish with [`SupervisorControl::release`] after returning
/// [`Dispatch::Hold`].
pub trait TranscriptHandler: Send + 'static {
    fn handle(&mut self, transcript: Transcript<'_>, control: &SupervisorControl) -> Dispatch;
}

impl<F> TranscriptHandler for F
where
    F: FnMut(Transcript<'_>, &SupervisorControl) -> Dispatch + Send + 'static,
{
    fn handle(&mut self, transcript: Transcript<'_>, control: &SupervisorControl) -> Dispatch {
        self(transcript, control)
    }
}

// ── Signals ────────────────────────────────────────────────────────

/// Events routed back to the supervisor.
#[derive(Debug)]
pub enum SupervisorSignal {
    /// Event from the channel of `generation`.
    Recognition {
        generation: u64,
        event: RecognitionEvent,
    },
    /// A restart timer armed at `generation` fired.
    Restart { generation: u64 },
    /// A handler finished its held work.
    Release,
}

/// Cloneable control surface given to handlers.
#[derive(Debug, Clone)]
pub struct SupervisorControl {
    signals: mpsc::UnboundedSender<SupervisorSignal>,
}

impl SupervisorControl {
    /// Resume listening after a [`Dispatch::Hold`]. No-op if not held.
    pub fn release(&self) {
        let _ = self.signals.send(SupervisorSignal::Release);
    }
}

// ── Supervisor ─────────────────────────────────────────────────────

/// Keeps one recognition channel open while enabled.
pub struct RecognitionSupervisor<H> {
    recognizer: Arc<dyn SpeechRecognizer>,
    handler: H,
    config: SupervisorConfig,
    enabled: bool,
    state: RecognitionState,
    channel: Option<Box<dyn RecognitionChannel>>,
    generation: u64,
    failures: u32,
    restart_timer: Option<JoinHandle<()>>,
    signal_tx: mpsc::UnboundedSender<SupervisorSignal>,
    status_tx: watch::Sender<RecognitionState>,
}

impl<H: TranscriptHandler> RecognitionSupervisor<H> {
    /// Create a stopped supervisor.
    ///
    /// Returns the supervisor and the receiver its signals arrive on; feed
    /// them back through [`RecognitionSupervisor::handle_signal`].
    #[must_use]
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        handler: H,
        config: SupervisorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SupervisorSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(RecognitionState::Stopped);

        let supervisor = Self {
            recognizer,
            handler,
            config,
            enabled: false,
            state: RecognitionState::Stopped,
            channel: None,
            generation: 0,
            failures: 0,
            restart_timer: None,
            signal_tx,
            status_tx,
        };

        (supervisor, signal_rx)
    }

    // ── Observation ────────────────────────────────────────────────

    pub const fn state(&self) -> RecognitionState {
        self.state
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn language(&self) -> &LanguageTag {
        &self.config.language
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<RecognitionState> {
        self.status_tx.subscribe()
    }

    /// Control surface handed to handlers.
    pub fn control(&self) -> SupervisorControl {
        SupervisorControl {
            signals: self.signal_tx.clone(),
        }
    }

    // ── Control ────────────────────────────────────────────────────

    /// Turn listening on or off.
    ///
    /// Enabling while suspended by a permission denial does nothing; the
    /// suspension is only cleared by disabling first.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            if enabled && self.state == RecognitionState::SuspendedByPermission {
                tracing::debug!(name = %self.config.name, "Still suspended; disable and re-enable to retry");
            }
            return;
        }

        self.enabled = enabled;
        if enabled {
            if !self.recognizer.is_supported() {
                tracing::warn!(name = %self.config.name, "Speech recognition is not supported");
                self.enabled = false;
                return;
            }
            tracing::info!(name = %self.config.name, language = %self.config.language, "Recognition enabled");
            self.failures = 0;
            self.open_channel();
        } else {
            tracing::info!(name = %self.config.name, "Recognition disabled");
            self.teardown();
            self.set_state(RecognitionState::Stopped);
        }
    }

    /// Switch language; an open channel is recreated in the new language.
    pub fn set_language(&mut self, language: LanguageTag) {
        if self.config.language == language {
            return;
        }
        tracing::debug!(name = %self.config.name, old = %self.config.language, new = %language, "Recognition language changed");
        self.config.language = language;

        if self.enabled && matches!(self.state, RecognitionState::Starting | RecognitionState::Listening) {
            self.teardown();
            self.open_channel();
        }
    }

    /// Resume after a [`Dispatch::Hold`]. No-op unless held.
    pub fn release(&mut self) {
        if self.enabled && self.state == RecognitionState::Held {
            tracing::debug!(name = %self.config.name, "Recognition released");
            self.schedule_restart(self.config.restart_delay);
        }
    }

    /// Disable and release everything.
    pub fn shutdown(&mut self) {
        self.set_enabled(false);
    }

    /// Apply a routed signal.
    pub fn handle_signal(&mut self, signal: SupervisorSignal) {
        match signal {
            SupervisorSignal::Recognition { generation, event } => {
                if generation != self.generation || self.channel.is_none() {
                    tracing::trace!(name = %self.config.name, generation, current = self.generation, "Ignoring stale recognition event");
                    return;
                }
                self.on_recognition(event);
            }
            SupervisorSignal::Restart { generation } => {
                if generation != self.generation || !self.enabled || self.state != RecognitionState::Starting {
                    return;
                }
                self.restart_timer = None;
                self.open_channel();
            }
            SupervisorSignal::Release => self.release(),
        }
    }

    // ── Recognition events ─────────────────────────────────────────

    fn on_recognition(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                self.failures = 0;
                self.set_state(RecognitionState::Listening);
            }
            RecognitionEvent::Transcript { text, is_final } => {
                if is_final {
                    self.on_transcript(&text);
                }
            }
            RecognitionEvent::Error(kind) => self.on_error(kind),
            RecognitionEvent::Ended => {
                tracing::debug!(name = %self.config.name, "Recognition channel ended, restarting");
                self.retire_channel();
                self.schedule_restart(self.config.restart_delay);
            }
        }
    }

    fn on_error(&mut self, kind: RecognitionErrorKind) {
        if kind.is_terminal() {
            tracing::warn!(name = %self.config.name, "Microphone permission denied; recognition suspended");
            self.teardown();
            self.set_state(RecognitionState::SuspendedByPermission);
            return;
        }

        tracing::debug!(name = %self.config.name, error = ?kind, "Transient recognition error, restarting");
        self.retire_channel();
        self.schedule_restart(self.config.restart_delay);
    }

    fn on_transcript(&mut self, raw: &str) {
        let text = normalize_transcript(raw);
        if text.is_empty() {
            return;
        }
        tracing::debug!(name = %self.config.name, transcript = %text, "Final transcript");

        let control = self.control();
        let transcript = Transcript {
            text: &text,
            raw: raw.trim(),
            language: &self.config.language,
        };

        if self.handler.handle(transcript, &control) == Dispatch::Hold {
            tracing::debug!(name = %self.config.name, "Handler holds recognition");
            self.teardown();
            self.set_state(RecognitionState::Held);
        }
    }

    // ── Channel lifecycle ──────────────────────────────────────────

    /// Open and start a fresh channel; on failure retry with backoff.
    fn open_channel(&mut self) {
        self.cancel_restart();
        self.generation += 1;
        let generation = self.generation;

        let signals = self.signal_tx.clone();
        let listener = Box::new(move |event| {
            let _ = signals.send(SupervisorSignal::Recognition { generation, event });
        });

        let recognition = RecognitionConfig::continuous(self.config.language.clone());
        let opened = self
            .recognizer
            .open(&recognition, listener)
            .and_then(|mut channel| channel.start().map(|()| channel));

        match opened {
            Ok(channel) => {
                tracing::debug!(name = %self.config.name, generation, "Recognition channel started");
                self.channel = Some(channel);
                self.set_state(RecognitionState::Starting);
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                let delay = self.config.backoff(self.failures);
                tracing::warn!(
                    name = %self.config.name,
                    error = %e,
                    failures = self.failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Could not start recognition, retrying"
                );
                self.generation += 1;
                self.schedule_restart(delay);
            }
        }
    }

    /// Forget the current channel so its late events are ignored.
    fn retire_channel(&mut self) {
        self.generation += 1;
        if let Some(mut channel) = self.channel.take() {
            channel.stop();
        }
    }

    /// Intentional stop: invalidate first, then stop the channel.
    fn teardown(&mut self) {
        self.cancel_restart();
        self.retire_channel();
    }

    fn schedule_restart(&mut self, delay: Duration) {
        self.cancel_restart();
        self.set_state(RecognitionState::Starting);

        let signals = self.signal_tx.clone();
        let generation = self.generation;
        self.restart_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(SupervisorSignal::Restart { generation });
        }));
    }

    fn cancel_restart(&mut self) {
        if let Some(timer) = self.restart_timer.take() {
            timer.abort();
        }
    }

    /// Transition to a new state and publish it.
    fn set_state(&mut self, new_state: RecognitionState) {
        if self.state != new_state {
            tracing::debug!(name = %self.config.name, old = ?self.state, new = ?new_state, "Recognition state transition");
            self.state = new_state;
            self.status_tx.send_replace(new_state);
        }
    }
}

impl<H> Drop for RecognitionSupervisor<H> {
    fn drop(&mut self) {
        if let Some(timer) = self.restart_timer.take() {
            timer.abort();
        }
        self.generation += 1;
        if let Some(mut channel) = self.channel.take() {
            channel.stop();
        }
    }
}

// ── Actor handle ───────────────────────────────────────────────────

enum SupervisorCommand {
    SetEnabled(bool),
    SetLanguage(LanguageTag),
    Release,
    Shutdown { reply: oneshot::Sender<()> },
}

/// `Send + Sync` handle to a supervisor running on its own task.
#[derive(Clone)]
pub struct SupervisorHandle {
    cmd_tx: mpsc::UnboundedSender<SupervisorCommand>,
    status_rx: watch::Receiver<RecognitionState>,
}

impl SupervisorHandle {
    /// Move `supervisor` onto a new task. Must be called inside a tokio runtime.
    pub fn spawn<H: TranscriptHandler>(
        supervisor: RecognitionSupervisor<H>,
        signals: mpsc::UnboundedReceiver<SupervisorSignal>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let status_rx = supervisor.subscribe();

        tokio::spawn(run(supervisor, cmd_rx, signals));

        Self { cmd_tx, status_rx }
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), VoiceError> {
        self.send(SupervisorCommand::SetEnabled(enabled))
    }

    pub fn set_language(&self, language: LanguageTag) -> Result<(), VoiceError> {
        self.send(SupervisorCommand::SetLanguage(language))
    }

    /// Manually re-engage after a hold.
    pub fn release(&self) -> Result<(), VoiceError> {
        self.send(SupervisorCommand::Release)
    }

    /// Latest published state.
    pub fn state(&self) -> RecognitionState {
        *self.status_rx.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<RecognitionState> {
        self.status_rx.clone()
    }

    /// Stop listening and wait for the task to exit.
    pub async fn shutdown(&self) -> Result<(), VoiceError> {
        let (tx, rx) = oneshot::channel();
        self.send(SupervisorCommand::Shutdown { reply: tx })?;
        rx.await.map_err(|_| VoiceError::SupervisorClosed)
    }

    fn send(&self, cmd: SupervisorCommand) -> Result<(), VoiceError> {
        self.cmd_tx.send(cmd).map_err(|_| VoiceError::SupervisorClosed)
    }
}

async fn run<H: TranscriptHandler>(
    mut supervisor: RecognitionSupervisor<H>,
    mut commands: mpsc::UnboundedReceiver<SupervisorCommand>,
    mut signals: mpsc::UnboundedReceiver<SupervisorSignal>,
) {
    tracing::debug!(name = %supervisor.name(), "Supervisor task started");

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    SupervisorCommand::SetEnabled(enabled) => supervisor.set_enabled(enabled),
                    SupervisorCommand::SetLanguage(language) => supervisor.set_language(language),
                    SupervisorCommand::Release => supervisor.release(),
                    SupervisorCommand::Shutdown { reply } => {
                        supervisor.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                }
            }
            Some(signal) = signals.recv() => supervisor.handle_signal(signal),
        }
    }

    supervisor.shutdown();
    tracing::debug!(name = %supervisor.name(), "Supervisor task exited");
}
