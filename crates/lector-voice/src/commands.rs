//! Voice commands: the command table, matching, and dispatch.
//!
//! The caller owns a `watch::Sender<CommandSnapshot>` and republishes it
//! whenever the UI context, language, or feedback toggle changes. The
//! dispatcher reads the latest snapshot on every transcript, never a copy
//! taken when listening started.

use std::fmt;
use std::sync::Arc;

use lector_core::{LanguageTag, SpeechEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::player::PlaybackHandle;
use crate::supervisor::{Dispatch, SupervisorControl, Transcript, TranscriptHandler};
use crate::text::normalize_transcript;

/// Callback run when a command matches.
pub type CommandAction = Arc<dyn Fn() + Send + Sync + 'static>;

// ── Command ────────────────────────────────────────────────────────

/// A voice command: trigger phrases, an action, and a spoken confirmation.
#[derive(Clone)]
pub struct Command {
    keywords: Vec<String>,
    feedback: String,
    action: CommandAction,
}

impl Command {
    /// Create a command. Keywords are trimmed and lowercased; empty ones are dropped.
    pub fn new<I, S>(keywords: I, feedback: impl Into<String>, action: impl Fn() + Send + Sync + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| normalize_transcript(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            keywords,
            feedback: feedback.into(),
            action: Arc::new(action),
        }
    }

    /// Trigger phrases, in priority order.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Phrase spoken to confirm the command (may be empty).
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// First keyword contained in an already-normalized transcript.
    pub fn matched_keyword(&self, transcript: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| transcript.contains(keyword.as_str()))
            .map(String::as_str)
    }

    /// Run the action.
    pub fn run(&self) {
        (self.action)();
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("keywords", &self.keywords)
            .field("feedback", &self.feedback)
            .finish_non_exhaustive()
    }
}

// ── Matching ───────────────────────────────────────────────────────

/// A command selected for a transcript.
#[derive(Debug, Clone, Copy)]
pub struct CommandMatch<'a> {
    pub command: &'a Command,
    pub keyword: &'a str,
}

/// Select at most one command for `transcript`.
///
/// The transcript is trimmed and lowercased, then the table is scanned in
/// order; the first command with a keyword that is a substring of the
/// transcript wins.
pub fn match_command<'a>(commands: &'a [Command], transcript: &str) -> Option<CommandMatch<'a>> {
    let transcript = normalize_transcript(transcript);
    if transcript.is_empty() {
        return None;
    }

    commands.iter().find_map(|command| {
        command
            .matched_keyword(&transcript)
            .map(|keyword| CommandMatch { command, keyword })
    })
}

// ── Snapshot ───────────────────────────────────────────────────────

/// The command table as currently published by the UI.
#[derive(Debug, Clone, Default)]
pub struct CommandSnapshot {
    /// Language of the table; feedback is spoken in it.
    pub language: LanguageTag,

    /// Commands in priority order.
    pub commands: Vec<Command>,

    /// Whether matched commands speak their feedback phrase.
    pub feedback_enabled: bool,
}

impl CommandSnapshot {
    pub const fn new(language: LanguageTag, commands: Vec<Command>, feedback_enabled: bool) -> Self {
        Self {
            language,
            commands,
            feedback_enabled,
        }
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// UI context a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandScope {
    /// Available everywhere, matched before any scope-specific command.
    Common,
    /// Main (capture) screen.
    Main,
    /// Document viewer.
    Viewer,
    /// Settings dialog.
    Settings,
}

/// Per-language command definitions grouped by scope.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    languages: Vec<(LanguageTag, Vec<(CommandScope, Command)>)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `command` to `scope` for `language`, after any already registered.
    pub fn register(&mut self, language: &LanguageTag, scope: CommandScope, command: Command) -> &mut Self {
        let index = match self
            .languages
            .iter()
            .position(|(tag, _)| tag.matches_exactly(language.as_str()))
        {
            Some(index) => index,
            None => {
                self.languages.push((language.clone(), Vec::new()));
                self.languages.len() - 1
            }
        };
        self.languages[index].1.push((scope, command));
        self
    }

    /// Languages with at least one command.
    pub fn languages(&self) -> impl Iterator<Item = &LanguageTag> {
        self.languages.iter().map(|(tag, _)| tag)
    }

    /// Active table for `scope`: common commands first, then the scope's own.
    pub fn table(&self, language: &LanguageTag, scope: CommandScope) -> Vec<Command> {
        let Some((_, entries)) = self
            .languages
            .iter()
            .find(|(tag, _)| tag.matches_exactly(language.as_str()))
        else {
            return Vec::new();
        };

        let common = entries.iter().filter(|(s, _)| *s == CommandScope::Common);
        let scoped = entries
            .iter()
            .filter(|(s, _)| scope != CommandScope::Common && *s == scope);

        common.chain(scoped).map(|(_, command)| command.clone()).collect()
    }

    /// Snapshot ready to publish for `(language, scope)`.
    pub fn snapshot(&self, language: &LanguageTag, scope: CommandScope, feedback_enabled: bool) -> CommandSnapshot {
        CommandSnapshot::new(language.clone(), self.table(language, scope), feedback_enabled)
    }
}

// ── Dispatch ───────────────────────────────────────────────────────

/// Transcript handler that runs at most one command per transcript.
pub struct CommandDispatcher {
    commands: watch::Receiver<CommandSnapshot>,
    feedback: Option<PlaybackHandle>,
    events: Option<mpsc::UnboundedSender<SpeechEvent>>,
}

impl CommandDispatcher {
    /// Dispatch against whatever `commands` holds at the time of each transcript.
    pub const fn new(commands: watch::Receiver<CommandSnapshot>) -> Self {
        Self {
            commands,
            feedback: None,
            events: None,
        }
    }

    /// Speak feedback phrases through `speaker`.
    #[must_use]
    pub fn with_feedback(mut self, speaker: PlaybackHandle) -> Self {
        self.feedback = Some(speaker);
        self
    }

    /// Report executed commands on `events`.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Match `transcript` against the latest table and run the winner.
    ///
    /// Feedback is issued before the action runs. Returns the keyword that
    /// matched.
    pub fn dispatch(&self, transcript: &str) -> Option<String> {
        // Copy out of the watch cell before running anything: an action may
        // publish a new table.
        let (command, keyword, language, feedback_enabled) = {
            let snapshot = self.commands.borrow();
            let found = match_command(&snapshot.commands, transcript)?;
            (
                found.command.clone(),
                found.keyword.to_string(),
                snapshot.language.clone(),
                snapshot.feedback_enabled,
            )
        };

        tracing::info!(%keyword, %language, "Executing voice command");

        if feedback_enabled && !command.feedback().is_empty() {
            if let Some(speaker) = &self.feedback {
                if let Err(e) = speaker.speak(command.feedback(), &language, None) {
                    tracing::warn!(error = %e, "Could not speak command feedback");
                }
            }
        }

        command.run();

        if let Some(events) = &self.events {
            let _ = events.send(SpeechEvent::CommandExecuted {
                transcript: normalize_transcript(transcript),
                keyword: keyword.clone(),
                language,
            });
        }

        Some(keyword)
    }
}

impl TranscriptHandler for CommandDispatcher {
    fn handle(&mut self, transcript: Transcript<'_>, _control: &SupervisorControl) -> Dispatch {
        if self.dispatch(transcript.text).is_none() {
            tracing::debug!(transcript = transcript.text, "No command matched");
        }
        Dispatch::Continue
    }
}
