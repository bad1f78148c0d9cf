//! Listen command handler.
//!
//! Runs the always-on command loop over typed transcripts and lets voice
//! commands control a reading of a text file. Command feedback is spoken by
//! a second engine so it never interrupts the reading.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lector_core::{LanguageTag, ReadingRate, RecognitionErrorKind, SpeechEvent, SpeechRecognizer};
use lector_voice::{
    Command, CommandDispatcher, CommandRegistry, CommandScope, CommandSnapshot, PlaybackHandle,
    RecognitionSupervisor, SupervisorHandle, VoiceError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use super::input::{Input, parse_input};
use crate::adapters::{ConsoleSynthesizer, LineRecognizer};
use crate::bootstrap::{CliConfig, spawn_player};
use crate::presentation::{EventPrinter, spawn_playback_events, spawn_recognition_events};

/// Read when no `--file` is given.
pub const DEFAULT_PASSAGE: &str = "The quick brown fox jumps over the lazy dog. \
    Say pause to stop for a moment, resume to carry on, or stop to end the reading.";

/// How long to wait after end of input before checking whether the reading is over.
const INPUT_CLOSED_GRACE: Duration = Duration::from_millis(500);

/// Something a voice command asks the reading to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderAction {
    Read,
    Pause,
    Resume,
    Stop,
    Faster,
    Slower,
    Feedback(bool),
    Language(LanguageTag),
}

fn command(
    keywords: &[&str],
    feedback: &str,
    actions: &mpsc::UnboundedSender<ReaderAction>,
    action: ReaderAction,
) -> Command {
    let actions = actions.clone();
    Command::new(keywords.iter().copied(), feedback, move || {
        let _ = actions.send(action.clone());
    })
}

/// English and Tamil command tables. Every command reports its action on
/// `actions`.
pub fn command_registry(actions: &mpsc::UnboundedSender<ReaderAction>) -> CommandRegistry {
    use CommandScope::{Common, Viewer};
    use ReaderAction::{Faster, Feedback, Language, Pause, Read, Resume, Slower, Stop};

    let en = LanguageTag::english();
    let ta = LanguageTag::tamil();
    let mut registry = CommandRegistry::new();

    registry
        .register(&en, Common, command(&["stop", "quiet"], "Stopping", actions, Stop))
        .register(&en, Common, command(&["feedback on"], "Feedback on", actions, Feedback(true)))
        .register(&en, Common, command(&["feedback off"], "Feedback off", actions, Feedback(false)))
        .register(&en, Common, command(&["tamil"], "தமிழ்", actions, Language(ta.clone())))
        .register(&en, Viewer, command(&["read", "start"], "Reading", actions, Read))
        .register(&en, Viewer, command(&["pause"], "Pausing", actions, Pause))
        .register(&en, Viewer, command(&["resume", "continue"], "Resuming", actions, Resume))
        .register(&en, Viewer, command(&["faster"], "Faster", actions, Faster))
        .register(&en, Viewer, command(&["slower"], "Slower", actions, Slower));

    registry
        .register(&ta, Common, command(&["நிறுத்து"], "நிறுத்துகிறேன்", actions, Stop))
        .register(&ta, Common, command(&["ஆங்கிலம்", "english"], "English", actions, Language(en.clone())))
        .register(&ta, Common, command(&["feedback on"], "", actions, Feedback(true)))
        .register(&ta, Common, command(&["feedback off"], "", actions, Feedback(false)))
        .register(&ta, Viewer, command(&["படி"], "படிக்கிறேன்", actions, Read))
        .register(&ta, Viewer, command(&["இடைவேளை"], "", actions, Pause))
        .register(&ta, Viewer, command(&["தொடர்"], "", actions, Resume))
        .register(&ta, Viewer, command(&["வேகமாக"], "", actions, Faster))
        .register(&ta, Viewer, command(&["மெதுவாக"], "", actions, Slower));

    registry
}

/// The reading under voice control.
pub struct Reading {
    reader: PlaybackHandle,
    supervisor: SupervisorHandle,
    text: Arc<str>,
    language: LanguageTag,
    rate: ReadingRate,
    feedback: bool,
    registry: CommandRegistry,
    table: watch::Sender<CommandSnapshot>,
}

impl Reading {
    fn snapshot(&self) -> CommandSnapshot {
        self.registry.snapshot(&self.language, CommandScope::Viewer, self.feedback)
    }

    pub fn language(&self) -> &LanguageTag {
        &self.language
    }

    pub const fn rate(&self) -> ReadingRate {
        self.rate
    }

    pub fn apply(&mut self, action: ReaderAction) -> Result<(), VoiceError> {
        tracing::debug!(?action, "Applying reader action");
        match action {
            ReaderAction::Read => self.reader.speak(self.text.as_ref(), &self.language, None),
            ReaderAction::Pause => self.reader.pause(),
            ReaderAction::Resume => self.reader.resume(),
            ReaderAction::Stop => self.reader.stop(),
            ReaderAction::Faster => {
                self.rate = self.rate.faster();
                self.reader.set_reading_rate(self.rate)
            }
            ReaderAction::Slower => {
                self.rate = self.rate.slower();
                self.reader.set_reading_rate(self.rate)
            }
            ReaderAction::Feedback(enabled) => {
                self.feedback = enabled;
                self.table.send_replace(self.snapshot());
                Ok(())
            }
            ReaderAction::Language(language) => {
                self.language = language;
                self.table.send_replace(self.snapshot());
                self.supervisor.set_language(self.language.clone())
            }
        }
    }
}

/// Everything the listen loop runs on.
pub struct Setup {
    pub reading: Reading,
    pub recognizer: Arc<LineRecognizer>,
    pub feedback: PlaybackHandle,
    pub actions: mpsc::UnboundedReceiver<ReaderAction>,
    pub events: mpsc::UnboundedReceiver<SpeechEvent>,
}

/// Compose engines, command tables, and the supervisor. Listening is not
/// enabled yet.
pub fn setup(config: &CliConfig, text: Arc<str>, word_duration: Duration) -> Setup {
    let language = config.language();
    let feedback_enabled = config.settings.effective_voice_feedback();

    let reader = spawn_player(
        Arc::new(ConsoleSynthesizer::with_word_duration(word_duration)),
        None,
        config.playback(),
    );
    let feedback = spawn_player(
        Arc::new(ConsoleSynthesizer::with_word_duration(word_duration)),
        None,
        config.playback(),
    );

    let (actions_tx, actions) = mpsc::unbounded_channel();
    let registry = command_registry(&actions_tx);
    let (table, table_rx) = watch::channel(registry.snapshot(&language, CommandScope::Viewer, feedback_enabled));

    let (events_tx, events) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::new(table_rx)
        .with_feedback(feedback.clone())
        .with_events(events_tx.clone());

    let recognizer = Arc::new(LineRecognizer::new());
    let (supervisor, signals) = RecognitionSupervisor::new(
        Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
        dispatcher,
        config.supervisor("commands"),
    );
    let supervisor = SupervisorHandle::spawn(supervisor, signals);

    spawn_playback_events(reader.subscribe(), Some(Arc::clone(&text)), events_tx.clone());
    spawn_recognition_events("commands", supervisor.subscribe(), events_tx);

    Setup {
        reading: Reading {
            reader,
            supervisor,
            text,
            language,
            rate: config.settings.effective_reading_rate(),
            feedback: feedback_enabled,
            registry,
            table,
        },
        recognizer,
        feedback,
        actions,
        events,
    }
}

/// Execute the listen command.
///
/// Runs until `/quit`, Ctrl+C, or end of input once the reading is over.
pub async fn execute(config: &CliConfig, file: Option<PathBuf>, printer: EventPrinter) -> Result<()> {
    let text: Arc<str> = match &file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?
            .into(),
        None => Arc::from(DEFAULT_PASSAGE),
    };

    let Setup {
        mut reading,
        recognizer,
        feedback,
        mut actions,
        mut events,
    } = setup(config, text, crate::adapters::DEFAULT_WORD_DURATION);

    if !config.settings.effective_voice_commands() {
        printer.note("Voice commands are disabled (LECTOR_VOICE_COMMANDS).");
    }
    reading.supervisor.set_enabled(config.settings.effective_voice_commands())?;
    printer.note("Type a command (read, pause, resume, stop, faster, slower, tamil, english). /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Blank => {}
                    Input::Fault(code) => {
                        if !recognizer.fail(RecognitionErrorKind::from_code(code)) {
                            printer.note("(not listening)");
                        }
                    }
                    Input::Speech(said) => {
                        if !recognizer.hear(said) {
                            printer.note("(not listening)");
                        }
                    }
                }
            }
            Some(action) = actions.recv() => {
                reading.apply(action)?;
            }
            Some(event) = events.recv() => printer.print(&event),
            // Piped input: commands still in flight get a moment before the
            // reading is checked.
            () = tokio::time::sleep(INPUT_CLOSED_GRACE), if !input_open => {
                if !reading.reader.status().state.is_active() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    reading.supervisor.shutdown().await?;
    reading.reader.shutdown().await?;
    feedback.shutdown().await?;
    while let Ok(event) = events.try_recv() {
        printer.print(&event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use lector_core::{PlaybackState, RecognitionState, SettingsUpdate};
    use tokio_test::assert_ok;

    use super::*;

    fn dispatcher_for(language: &LanguageTag) -> (CommandDispatcher, mpsc::UnboundedReceiver<ReaderAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = command_registry(&tx);
        let (_table, table_rx) = watch::channel(registry.snapshot(language, CommandScope::Viewer, false));
        (CommandDispatcher::new(table_rx), rx)
    }

    #[test]
    fn english_commands_map_to_actions() {
        let (dispatcher, mut actions) = dispatcher_for(&LanguageTag::english());

        for (said, expected) in [
            ("please read the page", ReaderAction::Read),
            ("pause", ReaderAction::Pause),
            ("continue please", ReaderAction::Resume),
            ("go faster", ReaderAction::Faster),
            ("feedback off", ReaderAction::Feedback(false)),
            ("switch to tamil", ReaderAction::Language(LanguageTag::tamil())),
        ] {
            assert!(dispatcher.dispatch(said).is_some(), "{said}");
            assert_eq!(actions.try_recv().unwrap(), expected);
        }
    }

    #[test]
    fn stop_wins_over_viewer_commands() {
        let (dispatcher, mut actions) = dispatcher_for(&LanguageTag::english());

        assert_eq!(dispatcher.dispatch("stop reading"), Some("stop".to_string()));
        assert_eq!(actions.try_recv().unwrap(), ReaderAction::Stop);
        assert!(actions.try_recv().is_err());
    }

    #[test]
    fn tamil_commands_map_to_actions() {
        let (dispatcher, mut actions) = dispatcher_for(&LanguageTag::tamil());

        assert!(dispatcher.dispatch("படி").is_some());
        assert_eq!(actions.try_recv().unwrap(), ReaderAction::Read);
        assert!(dispatcher.dispatch("இடைவேளை").is_some());
        assert_eq!(actions.try_recv().unwrap(), ReaderAction::Pause);
        assert!(dispatcher.dispatch("english please").is_some());
        assert_eq!(actions.try_recv().unwrap(), ReaderAction::Language(LanguageTag::english()));
    }

    fn config() -> CliConfig {
        CliConfig::resolve(&SettingsUpdate::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn typed_commands_control_the_reading() {
        let Setup {
            mut reading,
            recognizer,
            feedback,
            mut actions,
            events: _events,
        } = setup(&config(), Arc::from("one two three four"), Duration::from_millis(100));

        let mut state = reading.supervisor.subscribe();
        assert_ok!(reading.supervisor.set_enabled(true));
        state.wait_for(|s| *s == RecognitionState::Listening).await.unwrap();

        assert!(recognizer.hear("Read"));
        let action = actions.recv().await.unwrap();
        assert_eq!(action, ReaderAction::Read);
        assert_ok!(reading.apply(action));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(reading.reader.status().state, PlaybackState::Playing);

        assert!(recognizer.hear("pause"));
        let action = actions.recv().await.unwrap();
        assert_ok!(reading.apply(action));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(reading.reader.status().state, PlaybackState::Paused);

        assert!(recognizer.hear("resume"));
        let action = actions.recv().await.unwrap();
        assert_ok!(reading.apply(action));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(reading.reader.status().state, PlaybackState::Completed);

        assert_ok!(reading.supervisor.shutdown().await);
        assert_ok!(feedback.shutdown().await);
    }

    #[tokio::test(start_paused = true)]
    async fn language_switch_moves_recognition_and_tables() {
        let Setup {
            mut reading,
            recognizer,
            mut actions,
            ..
        } = setup(&config(), Arc::from("text"), Duration::from_millis(100));

        let mut state = reading.supervisor.subscribe();
        assert_ok!(reading.supervisor.set_enabled(true));
        state.wait_for(|s| *s == RecognitionState::Listening).await.unwrap();

        assert!(recognizer.hear("tamil"));
        let action = actions.recv().await.unwrap();
        assert_ok!(reading.apply(action));
        assert_eq!(reading.language(), &LanguageTag::tamil());

        // Recognition restarts in the new language; Tamil keywords now match.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(recognizer.hear("வேகமாக"));
        let action = actions.recv().await.unwrap();
        assert_eq!(action, ReaderAction::Faster);
        assert_ok!(reading.apply(action));
        assert_eq!(reading.rate(), ReadingRate::Fast);
    }
}
