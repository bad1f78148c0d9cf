//! One playback attempt: a driving utterance plus optional rendered audio.
//!
//! ```text
//!   rendered audio?
//!     no  ──▶ spoken utterance (audible, reading rate)      authority: TimingUtterance
//!     yes ──▶ Decoding ──ok──▶ output node + muted utterance authority: RenderedAudio
//!                  │
//!                  └──err──▶ spoken utterance (fallback)     authority: TimingUtterance
//! ```
//!
//! Capability callbacks never touch the session directly. They enqueue a
//! [`SessionSignal`] tagged with the [`SessionId`] that issued them and the
//! engine routes it back here, dropping anything addressed to a session that
//! is no longer current.

use std::fmt;
use std::sync::Arc;

use lector_core::{
    AudioBuffer, AudioContext, CapabilityError, HighlightSpan, LanguageTag, OutputNode,
    SpeechSynthesizer, Utterance, UtteranceEvent,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::rendered::RenderedAudio;
use crate::text::word_span_at;

// ── Identity ───────────────────────────────────────────────────────

/// Identity of a playback session, unique per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which source is allowed to complete the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAuthority {
    /// The utterance's own end completes the session.
    TimingUtterance,
    /// Only the rendered audio's output node completes the session.
    RenderedAudio,
}

// ── Signals ────────────────────────────────────────────────────────

/// Capability progress routed back to the engine.
#[derive(Debug)]
pub enum SessionSignal {
    /// Progress of the session's utterance.
    Utterance {
        session: SessionId,
        event: UtteranceEvent,
    },

    /// Rendered audio finished decoding.
    Decoded {
        session: SessionId,
        result: Result<AudioBuffer, CapabilityError>,
    },

    /// The output node drained naturally.
    OutputEnded { session: SessionId },
}

impl SessionSignal {
    /// Session the signal belongs to.
    pub const fn session(&self) -> SessionId {
        match self {
            Self::Utterance { session, .. }
            | Self::Decoded { session, .. }
            | Self::OutputEnded { session } => *session,
        }
    }
}

// ── Session ────────────────────────────────────────────────────────

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Rendered audio is being decoded; nothing is audible yet.
    Decoding,
    /// Audio is playing (or paused).
    Playing,
    /// The authoritative source finished.
    Completed,
    /// Playback could not be started at all.
    Failed,
    /// Stopped by the caller.
    Stopped,
}

impl SessionPhase {
    /// Whether the session can still produce audio.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Decoding | Self::Playing)
    }
}

/// What changed after handling a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Nothing observable.
    Unchanged,
    /// The highlighted span moved.
    Highlight(HighlightSpan),
    /// The session ended; see [`AudioMixSession::phase`] for how.
    Finished,
}

/// Parameters fixed for the lifetime of one session.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub text: Arc<str>,
    pub language: LanguageTag,
    /// Voice for the audible spoken path.
    pub voice: Option<String>,
    /// Rate for audible spoken output.
    pub reading_rate: f32,
    /// Rate for the muted timing utterance.
    pub timing_rate: f32,
}

/// Drives exactly one playback attempt to completion or interruption.
pub struct AudioMixSession {
    id: SessionId,
    setup: SessionSetup,
    authority: CompletionAuthority,
    phase: SessionPhase,
    paused: bool,
    highlight: Option<HighlightSpan>,
    synth: Arc<dyn SpeechSynthesizer>,
    context: Option<Arc<dyn AudioContext>>,
    output: Option<Box<dyn OutputNode>>,
    decode: Option<JoinHandle<()>>,
    signals: mpsc::UnboundedSender<SessionSignal>,
}

impl AudioMixSession {
    /// Start a session.
    ///
    /// With `rendered` audio and a context, decoding starts in the background
    /// and the session waits in [`SessionPhase::Decoding`]. Otherwise the
    /// audible utterance starts right away. Must be called inside a tokio
    /// runtime when rendered audio is supplied.
    pub fn start(
        id: SessionId,
        setup: SessionSetup,
        synth: Arc<dyn SpeechSynthesizer>,
        rendered: Option<(Arc<dyn AudioContext>, RenderedAudio)>,
        signals: mpsc::UnboundedSender<SessionSignal>,
    ) -> Self {
        let mut session = Self {
            id,
            setup,
            authority: CompletionAuthority::TimingUtterance,
            phase: SessionPhase::Decoding,
            paused: false,
            highlight: None,
            synth,
            context: None,
            output: None,
            decode: None,
            signals,
        };

        match rendered {
            Some((context, audio)) => {
                session.authority = CompletionAuthority::RenderedAudio;
                session.begin_decode(context, audio);
            }
            None => session.speak_audible(),
        }

        session
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.setup.text
    }

    pub const fn language(&self) -> &LanguageTag {
        &self.setup.language
    }

    pub const fn authority(&self) -> CompletionAuthority {
        self.authority
    }

    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    pub const fn highlight(&self) -> Option<HighlightSpan> {
        self.highlight
    }

    // ── Control ────────────────────────────────────────────────────

    /// Suspend output and the driving utterance. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        if !self.phase.is_live() || self.paused {
            return false;
        }
        self.paused = true;
        if let Some(output) = &self.output {
            output.suspend();
        }
        if self.phase == SessionPhase::Playing {
            self.synth.pause();
        }
        tracing::debug!(session = %self.id, "Session paused");
        true
    }

    /// Resume output and the driving utterance. Returns whether anything changed.
    pub fn resume(&mut self) -> bool {
        if !self.phase.is_live() || !self.paused {
            return false;
        }
        self.paused = false;
        if let Some(output) = &self.output {
            output.resume();
        }
        if self.phase == SessionPhase::Playing {
            self.synth.resume();
        }
        tracing::debug!(session = %self.id, "Session resumed");
        true
    }

    /// Stop everything and release the output node. Idempotent.
    pub fn stop(&mut self) {
        if self.phase == SessionPhase::Stopped {
            return;
        }
        let was_live = self.phase.is_live();
        self.phase = SessionPhase::Stopped;
        self.release();
        if was_live {
            self.synth.cancel();
        }
        tracing::debug!(session = %self.id, "Session stopped");
    }

    /// Apply a capability signal addressed to this session.
    pub fn handle(&mut self, signal: SessionSignal) -> SessionUpdate {
        if signal.session() != self.id || !self.phase.is_live() {
            return SessionUpdate::Unchanged;
        }

        match signal {
            SessionSignal::Utterance { event, .. } => self.on_utterance(event),
            SessionSignal::Decoded { result, .. } => self.on_decoded(result),
            SessionSignal::OutputEnded { .. } => self.on_output_ended(),
        }
    }

    // ── Signal handling ────────────────────────────────────────────

    fn on_utterance(&mut self, event: UtteranceEvent) -> SessionUpdate {
        match event {
            UtteranceEvent::Started => {
                tracing::trace!(session = %self.id, "Utterance started");
                SessionUpdate::Unchanged
            }
            UtteranceEvent::WordBoundary { offset } => self.on_boundary(offset),
            UtteranceEvent::Ended => match self.authority {
                CompletionAuthority::TimingUtterance => self.finish(SessionPhase::Completed),
                CompletionAuthority::RenderedAudio => {
                    tracing::debug!(session = %self.id, "Timing utterance finished before rendered audio");
                    SessionUpdate::Unchanged
                }
            },
            UtteranceEvent::Failed(reason) => match self.authority {
                CompletionAuthority::TimingUtterance => {
                    tracing::warn!(session = %self.id, %reason, "Spoken playback failed");
                    self.finish(SessionPhase::Failed)
                }
                CompletionAuthority::RenderedAudio => {
                    tracing::warn!(session = %self.id, %reason, "Timing utterance failed, highlighting stops");
                    SessionUpdate::Unchanged
                }
            },
        }
    }

    fn on_boundary(&mut self, offset: usize) -> SessionUpdate {
        let Some(span) = word_span_at(&self.setup.text, offset) else {
            return SessionUpdate::Unchanged;
        };

        if let Some(current) = self.highlight {
            if span.start_index < current.start_index || span == current {
                return SessionUpdate::Unchanged;
            }
        }

        self.highlight = Some(span);
        SessionUpdate::Highlight(span)
    }

    fn on_decoded(&mut self, result: Result<AudioBuffer, CapabilityError>) -> SessionUpdate {
        if self.phase != SessionPhase::Decoding {
            return SessionUpdate::Unchanged;
        }
        self.decode = None;

        let played = result.and_then(|buffer| {
            let context = self
                .context
                .as_ref()
                .ok_or_else(|| CapabilityError::Unavailable("audio context released".into()))?;
            let signals = self.signals.clone();
            let session = self.id;
            context.play(
                buffer,
                Box::new(move || {
                    let _ = signals.send(SessionSignal::OutputEnded { session });
                }),
            )
        });

        match played {
            Ok(output) => {
                if self.paused {
                    output.suspend();
                }
                self.output = Some(output);
                self.speak_muted();
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Rendered audio unavailable, falling back to spoken playback");
                self.context = None;
                self.authority = CompletionAuthority::TimingUtterance;
                self.speak_audible();
            }
        }

        if self.phase.is_live() {
            SessionUpdate::Unchanged
        } else {
            SessionUpdate::Finished
        }
    }

    fn on_output_ended(&mut self) -> SessionUpdate {
        if self.authority != CompletionAuthority::RenderedAudio || self.output.is_none() {
            return SessionUpdate::Unchanged;
        }
        self.synth.cancel();
        self.finish(SessionPhase::Completed)
    }

    // ── Internals ──────────────────────────────────────────────────

    fn begin_decode(&mut self, context: Arc<dyn AudioContext>, audio: RenderedAudio) {
        let (bytes, format) = audio.into_parts();
        let signals = self.signals.clone();
        let session = self.id;
        let decoder = Arc::clone(&context);

        self.context = Some(context);
        self.phase = SessionPhase::Decoding;
        self.decode = Some(tokio::spawn(async move {
            let result = decoder.decode(bytes, format).await;
            let _ = signals.send(SessionSignal::Decoded { session, result });
        }));
        tracing::debug!(session = %self.id, "Decoding rendered audio");
    }

    /// Audible utterance at the reading rate, also the completion authority.
    fn speak_audible(&mut self) {
        let mut utterance = Utterance::new(self.setup.text.to_string(), self.setup.language.clone());
        utterance.voice.clone_from(&self.setup.voice);
        utterance.rate = self.setup.reading_rate;
        self.speak(utterance);
    }

    /// Silent, slowed utterance that only provides word-boundary timing.
    fn speak_muted(&mut self) {
        let mut utterance = Utterance::new(self.setup.text.to_string(), self.setup.language.clone());
        utterance.rate = self.setup.timing_rate;
        utterance.volume = 0.0;
        self.speak(utterance);
    }

    fn speak(&mut self, utterance: Utterance) {
        let signals = self.signals.clone();
        let session = self.id;
        let muted = utterance.is_muted();
        let listener = Box::new(move |event| {
            let _ = signals.send(SessionSignal::Utterance { session, event });
        });

        match self.synth.speak(utterance, listener) {
            Ok(()) => {
                self.phase = SessionPhase::Playing;
                if self.paused {
                    self.synth.pause();
                }
                tracing::debug!(session = %self.id, muted, authority = ?self.authority, "Utterance started");
            }
            Err(e) if muted => {
                // Rendered audio keeps playing without highlights.
                self.phase = SessionPhase::Playing;
                tracing::warn!(session = %self.id, error = %e, "Timing utterance could not start");
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Spoken playback could not start");
                self.finish(SessionPhase::Failed);
            }
        }
    }

    fn finish(&mut self, phase: SessionPhase) -> SessionUpdate {
        self.phase = phase;
        self.release();
        tracing::debug!(session = %self.id, ?phase, "Session finished");
        SessionUpdate::Finished
    }

    fn release(&mut self) {
        if let Some(decode) = self.decode.take() {
            decode.abort();
        }
        if let Some(output) = self.output.take() {
            output.stop();
        }
        self.context = None;
        self.highlight = None;
        self.paused = false;
    }
}

impl fmt::Debug for AudioMixSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioMixSession")
            .field("id", &self.id)
            .field("authority", &self.authority)
            .field("phase", &self.phase)
            .field("paused", &self.paused)
            .field("highlight", &self.highlight)
            .finish_non_exhaustive()
    }
}
