//! Integration tests for voice command matching and dispatch.
//!
//! # What is tested
//!
//! - First-match-wins selection over the command table
//! - Dispatch through a running recognition supervisor
//! - Spoken feedback, its toggle, and `CommandExecuted` events
//! - Table changes take effect on the next transcript

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lector_core::{LanguageTag, RecognitionState, SpeechEvent, SpeechRecognizer, SpeechSynthesizer};
use lector_voice::{
    Command, CommandDispatcher, CommandRegistry, CommandScope, CommandSnapshot, PlaybackConfig,
    PlaybackEngine, PlaybackHandle, RecognitionSupervisor, SupervisorConfig, SupervisorHandle,
    match_command,
};
use tokio::sync::{mpsc, watch};
use tokio_test::assert_ok;

use support::{FakeRecognizer, FakeSynth};

// ── Helpers ────────────────────────────────────────────────────────

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

fn counting(keywords: &[&str], feedback: &str, counter: &Arc<AtomicUsize>) -> Command {
    let counter = Arc::clone(counter);
    Command::new(keywords.iter().copied(), feedback, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

fn feedback_player(synth: &Arc<FakeSynth>) -> PlaybackHandle {
    let (engine, signals) = PlaybackEngine::new(
        Arc::clone(synth) as Arc<dyn SpeechSynthesizer>,
        None,
        PlaybackConfig::default(),
    );
    PlaybackHandle::spawn(engine, signals)
}

async fn listening(
    recognizer: &Arc<FakeRecognizer>,
    dispatcher: CommandDispatcher,
) -> SupervisorHandle {
    let config = SupervisorConfig::new("commands", LanguageTag::english());
    let (supervisor, signals) =
        RecognitionSupervisor::new(Arc::clone(recognizer) as Arc<dyn SpeechRecognizer>, dispatcher, config);
    let handle = SupervisorHandle::spawn(supervisor, signals);

    let mut state = handle.subscribe();
    handle.set_enabled(true).unwrap();
    state.wait_for(|s| *s == RecognitionState::Listening).await.unwrap();
    handle
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ── Matching ───────────────────────────────────────────────────────

#[test]
fn first_matching_command_fires_once() {
    let stop = counter();
    let play = counter();
    let (_tx, rx) = watch::channel(CommandSnapshot::new(
        LanguageTag::english(),
        vec![
            counting(&["stop"], "", &stop),
            counting(&["resume", "play"], "", &play),
        ],
        false,
    ));
    let dispatcher = CommandDispatcher::new(rx);

    assert_eq!(dispatcher.dispatch("please stop now"), Some("stop".to_string()));
    assert_eq!((hits(&stop), hits(&play)), (1, 0));

    assert_eq!(dispatcher.dispatch("play please"), Some("play".to_string()));
    assert_eq!((hits(&stop), hits(&play)), (1, 1));

    assert_eq!(dispatcher.dispatch("nonsense"), None);
    assert_eq!((hits(&stop), hits(&play)), (1, 1));
}

#[test]
fn matching_ignores_case_and_padding() {
    let hits = counter();
    let table = vec![counting(&["Next Page"], "", &hits)];

    let found = match_command(&table, "  GO TO THE NEXT PAGE ").unwrap();
    assert_eq!(found.keyword, "next page");

    assert!(match_command(&table, "next").is_none());
}

#[test]
fn table_order_beats_keyword_order() {
    let stop = counter();
    let play = counter();
    let table = vec![
        counting(&["play"], "", &play),
        counting(&["stop"], "", &stop),
    ];

    // Both keywords occur; the earlier command wins.
    let found = match_command(&table, "stop the play").unwrap();
    assert_eq!(found.keyword, "play");
}

#[test]
fn registry_snapshot_puts_common_commands_first() {
    let help = counter();
    let pause = counter();
    let en = LanguageTag::english();
    let mut registry = CommandRegistry::new();
    registry
        .register(&en, CommandScope::Viewer, counting(&["pause"], "", &pause))
        .register(&en, CommandScope::Common, counting(&["help"], "", &help));

    let (_tx, rx) = watch::channel(registry.snapshot(&en, CommandScope::Viewer, false));
    let dispatcher = CommandDispatcher::new(rx);

    assert_eq!(dispatcher.dispatch("help me pause"), Some("help".to_string()));
    assert_eq!((hits(&help), hits(&pause)), (1, 0));
}

// ── Dispatch through recognition ───────────────────────────────────

#[tokio::test(start_paused = true)]
async fn recognized_command_speaks_feedback_and_reports() {
    let synth = FakeSynth::new();
    let recognizer = FakeRecognizer::auto_starting();
    let stop = counter();
    let (_tx, rx) = watch::channel(CommandSnapshot::new(
        LanguageTag::english(),
        vec![counting(&["stop"], "Stopping", &stop)],
        true,
    ));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::new(rx)
        .with_feedback(feedback_player(&synth))
        .with_events(events_tx);
    let handle = listening(&recognizer, dispatcher).await;

    recognizer.say(0, "Please STOP now");
    settle().await;

    assert_eq!(hits(&stop), 1);
    assert_eq!(synth.spoken_texts(), ["Stopping"]);
    assert_eq!(
        events_rx.try_recv().unwrap(),
        SpeechEvent::CommandExecuted {
            transcript: "please stop now".to_string(),
            keyword: "stop".to_string(),
            language: LanguageTag::english(),
        }
    );

    // Commands never pause listening.
    assert_eq!(handle.state(), RecognitionState::Listening);
    assert_eq!(recognizer.opens(), 1);
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn feedback_toggle_silences_confirmation() {
    let synth = FakeSynth::new();
    let recognizer = FakeRecognizer::auto_starting();
    let stop = counter();
    let (_tx, rx) = watch::channel(CommandSnapshot::new(
        LanguageTag::english(),
        vec![counting(&["stop"], "Stopping", &stop)],
        false,
    ));
    let dispatcher = CommandDispatcher::new(rx).with_feedback(feedback_player(&synth));
    let handle = listening(&recognizer, dispatcher).await;

    recognizer.say(0, "stop");
    settle().await;

    assert_eq!(hits(&stop), 1);
    assert!(synth.spoken().is_empty());
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn table_changes_apply_to_the_next_transcript() {
    let recognizer = FakeRecognizer::auto_starting();
    let main = counter();
    let viewer = counter();
    let (tx, rx) = watch::channel(CommandSnapshot::new(
        LanguageTag::english(),
        vec![counting(&["open"], "", &main)],
        false,
    ));
    let handle = listening(&recognizer, CommandDispatcher::new(rx)).await;

    recognizer.say(0, "open");
    settle().await;

    // The UI moved to another screen after listening started.
    tx.send_replace(CommandSnapshot::new(
        LanguageTag::english(),
        vec![counting(&["open"], "", &viewer)],
        false,
    ));
    recognizer.say(0, "open");
    settle().await;

    assert_eq!((hits(&main), hits(&viewer)), (1, 1));
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn unmatched_speech_does_nothing() {
    let synth = FakeSynth::new();
    let recognizer = FakeRecognizer::auto_starting();
    let stop = counter();
    let (_tx, rx) = watch::channel(CommandSnapshot::new(
        LanguageTag::english(),
        vec![counting(&["stop"], "Stopping", &stop)],
        true,
    ));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::new(rx)
        .with_feedback(feedback_player(&synth))
        .with_events(events_tx);
    let handle = listening(&recognizer, dispatcher).await;

    recognizer.say(0, "nonsense");
    settle().await;

    assert_eq!(hits(&stop), 0);
    assert!(synth.spoken().is_empty());
    assert!(events_rx.try_recv().is_err());
    assert_ok!(handle.shutdown().await);
}
