//! Chat command handler.
//!
//! Runs the dialogue loop: each typed line is a question, the echo responder
//! answers, the answer is read aloud, and listening resumes afterwards. A
//! reply with a media link keeps listening off until an empty line is entered.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lector_core::{RecognitionErrorKind, RecognitionState, ResponseMode, SpeechEvent, SpeechRecognizer};
use lector_voice::{DialogueHandler, PlaybackHandle, RecognitionSupervisor, SupervisorHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::input::{Input, parse_input};
use crate::adapters::{ConsoleSynthesizer, EchoResponder, LineRecognizer};
use crate::bootstrap::{CliConfig, spawn_player};
use crate::presentation::{
    EventPrinter, spawn_dialogue_events, spawn_playback_events, spawn_recognition_events,
};

/// Everything the chat loop runs on.
pub struct Conversation {
    pub supervisor: SupervisorHandle,
    pub speaker: PlaybackHandle,
    pub recognizer: Arc<LineRecognizer>,
    pub events: mpsc::UnboundedReceiver<SpeechEvent>,
}

/// Compose the dialogue loop. Listening is not enabled yet.
pub fn setup(config: &CliConfig, mode: ResponseMode, responder: EchoResponder, word_duration: Duration) -> Conversation {
    let speaker = spawn_player(
        Arc::new(ConsoleSynthesizer::with_word_duration(word_duration)),
        None,
        config.playback(),
    );

    let handler = DialogueHandler::new(Arc::new(responder), speaker.clone(), mode);
    let dialogue = handler.subscribe();

    let recognizer = Arc::new(LineRecognizer::new());
    let (supervisor, signals) = RecognitionSupervisor::new(
        Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
        handler,
        config.supervisor("dialogue"),
    );
    let supervisor = SupervisorHandle::spawn(supervisor, signals);

    let (events_tx, events) = mpsc::unbounded_channel();
    spawn_playback_events(speaker.subscribe(), None, events_tx.clone());
    spawn_recognition_events("dialogue", supervisor.subscribe(), events_tx.clone());
    spawn_dialogue_events(dialogue, events_tx);

    Conversation {
        supervisor,
        speaker,
        recognizer,
        events,
    }
}

/// Execute the chat command.
///
/// Runs until `/quit`, Ctrl+C, or end of input.
pub async fn execute(config: &CliConfig, thinking: bool, printer: EventPrinter) -> Result<()> {
    let mode = if thinking {
        ResponseMode::Thinking
    } else {
        ResponseMode::Fast
    };
    let Conversation {
        supervisor,
        speaker,
        recognizer,
        mut events,
    } = setup(config, mode, EchoResponder::default(), crate::adapters::DEFAULT_WORD_DURATION);

    supervisor.set_enabled(true)?;
    printer.note("Say something (one line per utterance). Empty line re-engages after media. /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Blank => {
                        if supervisor.state() == RecognitionState::Held {
                            supervisor.release()?;
                        }
                    }
                    Input::Fault(code) => {
                        if !recognizer.fail(RecognitionErrorKind::from_code(code)) {
                            printer.note("(not listening)");
                        }
                    }
                    Input::Speech(said) => {
                        if !recognizer.hear(said) {
                            printer.note("(not listening - wait for the reply to finish)");
                        }
                    }
                }
            }
            Some(event) = events.recv() => printer.print(&event),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    supervisor.shutdown().await?;
    speaker.shutdown().await?;
    while let Ok(event) = events.try_recv() {
        printer.print(&event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use lector_core::{DialogueStatus, SettingsUpdate};
    use tokio_test::assert_ok;

    use super::*;

    async fn listening(mode: ResponseMode) -> Conversation {
        let config = CliConfig::resolve(&SettingsUpdate::default()).unwrap();
        let chat = setup(&config, mode, EchoResponder::new(Duration::from_secs(1)), Duration::from_millis(50));
        let mut state = chat.supervisor.subscribe();
        assert_ok!(chat.supervisor.set_enabled(true));
        state.wait_for(|s| *s == RecognitionState::Listening).await.unwrap();
        chat
    }

    fn dialogue_statuses(events: &mut mpsc::UnboundedReceiver<SpeechEvent>) -> Vec<DialogueStatus> {
        let mut statuses = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SpeechEvent::DialogueStatusChanged { status } = event {
                statuses.push(status);
            }
        }
        statuses
    }

    #[tokio::test(start_paused = true)]
    async fn a_question_is_answered_and_listening_resumes() {
        let mut chat = listening(ResponseMode::Fast).await;

        assert!(chat.recognizer.hear("Hello there"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let statuses = dialogue_statuses(&mut chat.events);
        assert!(statuses.contains(&DialogueStatus::Speaking {
            reply: "You said: Hello there".to_string()
        }));
        assert_eq!(chat.supervisor.state(), RecognitionState::Listening);
        assert!(chat.recognizer.is_listening());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_heard_while_answering() {
        let chat = listening(ResponseMode::Thinking).await;

        assert!(chat.recognizer.hear("why is the sky blue"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(chat.supervisor.state(), RecognitionState::Held);
        assert!(!chat.recognizer.hear("interrupting"));
    }

    #[tokio::test(start_paused = true)]
    async fn media_links_wait_for_release() {
        let chat = listening(ResponseMode::Fast).await;

        assert!(chat.recognizer.hear("play https://youtu.be/abcdef123"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(chat.supervisor.state(), RecognitionState::Held);

        assert_ok!(chat.supervisor.release());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(chat.supervisor.state(), RecognitionState::Listening);
    }
}
