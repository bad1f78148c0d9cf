//! Playback engine: the single point of control for "speak this text".
//!
//! The engine owns at most one [`AudioMixSession`]. Every `speak` stops the
//! previous session synchronously before the next one starts, so two sessions
//! never have output connected at the same time.
//!
//! ```text
//!   Idle ──speak──▶ Playing ◀──pause/resume──▶ Paused
//!     ▲                │
//!     │        (authoritative end)
//!     └─── stop ─── Completed
//! ```
//!
//! The engine is synchronous. Capability progress arrives as
//! [`SessionSignal`]s on the receiver returned by [`PlaybackEngine::new`] and
//! must be fed back through [`PlaybackEngine::handle_signal`];
//! [`crate::player::PlaybackHandle`] does that on a tokio task.

use std::sync::Arc;

use lector_core::{
    AudioBackend, AudioContext, HighlightSpan, LanguageTag, PlaybackState, ReadingRate, Settings,
    SpeechSynthesizer,
};
use tokio::sync::{mpsc, watch};

use crate::rendered::RenderedAudio;
use crate::session::{
    AudioMixSession, SessionId, SessionPhase, SessionSetup, SessionSignal, SessionUpdate,
};
use crate::voices::VoiceCache;

// ── Configuration ──────────────────────────────────────────────────

/// Playback engine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Rate for audible spoken playback.
    pub reading_rate: ReadingRate,

    /// Rate of the muted utterance that times highlights for rendered audio.
    pub timing_rate: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reading_rate: ReadingRate::Normal,
            timing_rate: lector_core::DEFAULT_TIMING_RATE,
        }
    }
}

impl PlaybackConfig {
    /// Build from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            reading_rate: settings.effective_reading_rate(),
            timing_rate: settings.effective_timing_rate(),
        }
    }
}

// ── Status ─────────────────────────────────────────────────────────

/// Observable engine status, published on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    /// Most recent session, if any was ever started.
    pub session: Option<SessionId>,

    /// Engine state.
    pub state: PlaybackState,

    /// Highlighted span in the current session's text.
    pub highlight: Option<HighlightSpan>,
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }
}

// ── Engine ─────────────────────────────────────────────────────────

/// Speak/pause/resume/stop with synchronized word highlighting.
pub struct PlaybackEngine {
    synth: Arc<dyn SpeechSynthesizer>,
    backend: Option<Arc<dyn AudioBackend>>,
    context: Option<Arc<dyn AudioContext>>,
    voices: VoiceCache,
    config: PlaybackConfig,
    session: Option<AudioMixSession>,
    next_id: u64,
    status: PlaybackStatus,
    status_tx: watch::Sender<PlaybackStatus>,
    signal_tx: mpsc::UnboundedSender<SessionSignal>,
    disposed: bool,
}

impl PlaybackEngine {
    /// Create an engine.
    ///
    /// `backend` plays rendered audio; without one every session uses spoken
    /// playback. Returns the engine and the receiver its capability signals
    /// arrive on.
    #[must_use]
    pub fn new(
        synth: Arc<dyn SpeechSynthesizer>,
        backend: Option<Arc<dyn AudioBackend>>,
        config: PlaybackConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(PlaybackStatus::default());

        let engine = Self {
            synth,
            backend,
            context: None,
            voices: VoiceCache::new(),
            config,
            session: None,
            next_id: 0,
            status: PlaybackStatus::default(),
            status_tx,
            signal_tx,
            disposed: false,
        };

        (engine, signal_rx)
    }

    // ── Observation ────────────────────────────────────────────────

    pub const fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn state(&self) -> PlaybackState {
        self.status.state
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.status.is_paused()
    }

    pub const fn highlight(&self) -> Option<HighlightSpan> {
        self.status.highlight
    }

    /// Text of the active session.
    pub fn current_text(&self) -> Option<&str> {
        self.session.as_ref().map(AudioMixSession::text)
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_tx.subscribe()
    }

    pub const fn reading_rate(&self) -> ReadingRate {
        self.config.reading_rate
    }

    /// Change the rate used by subsequent spoken sessions.
    pub fn set_reading_rate(&mut self, rate: ReadingRate) {
        if self.config.reading_rate != rate {
            tracing::debug!(old = ?self.config.reading_rate, new = ?rate, "Reading rate changed");
            self.config.reading_rate = rate;
        }
    }

    // ── Control ────────────────────────────────────────────────────

    /// Speak `text`, stopping whatever was playing first.
    ///
    /// With `rendered` audio (and a working audio backend) the rendered clip
    /// is what the user hears and a muted utterance drives the highlight.
    /// Empty or whitespace-only text is ignored. Returns the new session id.
    pub fn speak(
        &mut self,
        text: &str,
        language: &LanguageTag,
        rendered: Option<RenderedAudio>,
    ) -> Option<SessionId> {
        if self.disposed {
            tracing::warn!("speak() on a disposed playback engine");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.stop();

        self.next_id += 1;
        let id = SessionId::new(self.next_id);

        let rendered = rendered.filter(|audio| !audio.is_empty()).and_then(|audio| {
            let context = self.audio_context();
            if context.is_none() {
                tracing::warn!(session = %id, "No audio output available, using spoken playback");
            }
            context.map(|context| (context, audio))
        });

        // Picked even with rendered audio so a spoken fallback keeps the language's voice.
        let voice = self.voices.pick(self.synth.as_ref(), language);

        let setup = SessionSetup {
            text: Arc::from(text),
            language: language.clone(),
            voice,
            reading_rate: self.config.reading_rate.multiplier(),
            timing_rate: self.config.timing_rate,
        };

        tracing::debug!(session = %id, %language, rendered = rendered.is_some(), "Starting playback session");

        let session = AudioMixSession::start(
            id,
            setup,
            Arc::clone(&self.synth),
            rendered,
            self.signal_tx.clone(),
        );

        let state = if session.phase().is_live() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        };
        if session.phase().is_live() {
            self.session = Some(session);
        }

        self.publish(PlaybackStatus {
            session: Some(id),
            state,
            highlight: None,
        });

        Some(id)
    }

    /// Pause the active session. No-op unless playing.
    pub fn pause(&mut self) -> bool {
        if self.status.state != PlaybackState::Playing {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.pause() {
            return false;
        }
        self.publish(PlaybackStatus {
            state: PlaybackState::Paused,
            ..self.status
        });
        true
    }

    /// Resume the active session. No-op unless paused.
    pub fn resume(&mut self) -> bool {
        if self.status.state != PlaybackState::Paused {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.resume() {
            return false;
        }
        self.publish(PlaybackStatus {
            state: PlaybackState::Playing,
            ..self.status
        });
        true
    }

    /// Stop the active session and clear the highlight. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.publish(PlaybackStatus {
            state: PlaybackState::Idle,
            highlight: None,
            ..self.status
        });
    }

    /// Stop for good. Runs `stop` exactly once; later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.stop();
        self.context = None;
        tracing::debug!("Playback engine disposed");
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Route a capability signal to the session that issued it.
    ///
    /// Signals for sessions that are no longer current are dropped.
    pub fn handle_signal(&mut self, signal: SessionSignal) {
        let Some(session) = self.session.as_mut() else {
            tracing::trace!(session = %signal.session(), "Dropping signal, no active session");
            return;
        };
        if session.id() != signal.session() {
            tracing::trace!(
                signal = %signal.session(),
                current = %session.id(),
                "Dropping signal from superseded session"
            );
            return;
        }

        match session.handle(signal) {
            SessionUpdate::Unchanged => {}
            SessionUpdate::Highlight(span) => {
                self.publish(PlaybackStatus {
                    highlight: Some(span),
                    ..self.status
                });
            }
            SessionUpdate::Finished => {
                let phase = session.phase();
                self.session = None;
                let state = if phase == SessionPhase::Completed {
                    PlaybackState::Completed
                } else {
                    PlaybackState::Idle
                };
                self.publish(PlaybackStatus {
                    state,
                    highlight: None,
                    ..self.status
                });
            }
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Shared audio context, opened on first use and reopened if closed.
    fn audio_context(&mut self) -> Option<Arc<dyn AudioContext>> {
        let backend = self.backend.as_ref()?;

        if let Some(context) = &self.context {
            if !context.is_closed() {
                return Some(Arc::clone(context));
            }
            tracing::debug!("Audio context closed, reopening");
        }

        match backend.open() {
            Ok(context) => {
                self.context = Some(Arc::clone(&context));
                Some(context)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open audio context");
                self.context = None;
                None
            }
        }
    }

    /// Record and broadcast a new status if it differs.
    fn publish(&mut self, status: PlaybackStatus) {
        if self.status != status {
            tracing::debug!(
                old = ?self.status.state,
                new = ?status.state,
                session = ?status.session.map(SessionId::get),
                "Playback status"
            );
            self.status = status;
            self.status_tx.send_replace(status);
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_normal_rate_and_slow_timing() {
        let config = PlaybackConfig::default();
        assert_eq!(config.reading_rate, ReadingRate::Normal);
        assert!((config.timing_rate - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn config_follows_settings() {
        let settings = Settings {
            reading_rate: Some(ReadingRate::Fast),
            timing_rate: Some(0.5),
            ..Settings::default()
        };
        let config = PlaybackConfig::from_settings(&settings);
        assert_eq!(config.reading_rate, ReadingRate::Fast);
        assert!((config.timing_rate - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn status_flags_follow_state() {
        let status = PlaybackStatus {
            state: PlaybackState::Paused,
            ..PlaybackStatus::default()
        };
        assert!(status.is_paused());
        assert!(!status.is_playing());
    }
}
