//! Voice task against a scripted transcriber.

use homeguard::app::commands::VoiceCommand;
use homeguard::app::events::{AppEvent, ArmSource};
use homeguard::app::ports::ListenOutcome;
use homeguard::config::{TimingConfig, VoiceConfig};
use homeguard::state::SharedSystemState;
use homeguard::voice::{SessionState, VoiceAction, VoiceTask};

use crate::mock_hw::{MockPlayer, RecordingSink, ScriptedTranscriber, VirtualDelay, text, virtual_time};

type Task = VoiceTask<ScriptedTranscriber, MockPlayer, VirtualDelay, RecordingSink>;

struct Rig {
    task: Task,
    player: MockPlayer,
    delay: VirtualDelay,
    sink: RecordingSink,
    state: SharedSystemState,
    voice: VoiceConfig,
}

fn rig(outcomes: Vec<ListenOutcome>) -> Rig {
    rig_with(outcomes, MockPlayer::default())
}

fn rig_with(outcomes: Vec<ListenOutcome>, player: MockPlayer) -> Rig {
    let (_clock, delay) = virtual_time();
    let sink = RecordingSink::default();
    let state = SharedSystemState::new();
    let voice = VoiceConfig::default();
    let task = VoiceTask::new(
        ScriptedTranscriber::new(outcomes),
        player.clone(),
        delay.clone(),
        sink.clone(),
        state.clone(),
        voice.clone(),
        &TimingConfig::default(),
    );
    Rig {
        task,
        player,
        delay,
        sink,
        state,
        voice,
    }
}

fn run(r: &mut Rig, steps: usize) -> Vec<VoiceAction> {
    (0..steps).map(|_| r.task.step()).collect()
}

#[test]
fn wake_then_lock_arms_the_system() {
    let mut r = rig(vec![text("hey jarvis"), text("please lock system now")]);
    let actions = run(&mut r, 2);

    assert_eq!(
        actions,
        vec![VoiceAction::Woke, VoiceAction::Command(VoiceCommand::Lock)]
    );
    assert!(r.state.armed());
    assert_eq!(
        r.player.urls(),
        vec![r.voice.wake_cue_url.clone(), r.voice.lock_cue_url.clone()]
    );
    assert_eq!(r.delay.sleeps(), vec![1000, 1000]);
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            AppEvent::ArmedChanged {
                armed: true,
                source: ArmSource::Voice
            }
        )),
        1
    );
}

#[test]
fn deactivate_disarms_and_plays_its_cue() {
    let mut r = rig(vec![text("Hey Jarvis"), text("DEACTIVATE SYSTEM")]);
    r.state.set_armed(true);
    run(&mut r, 2);
    assert!(!r.state.armed());
    assert_eq!(r.player.urls().last(), Some(&r.voice.deactivate_cue_url));
}

#[test]
fn commands_before_wake_are_ignored() {
    let mut r = rig(vec![text("lock system"), ListenOutcome::Unintelligible]);
    let actions = run(&mut r, 2);
    assert_eq!(actions, vec![VoiceAction::None, VoiceAction::None]);
    assert!(!r.state.armed());
    assert!(r.player.urls().is_empty());
}

#[test]
fn ten_garbled_attempts_end_the_session() {
    let mut outcomes = vec![text("hey jarvis")];
    outcomes.extend((0..10).map(|_| ListenOutcome::Unintelligible));
    outcomes.push(text("lock system"));
    let mut r = rig(outcomes);

    let actions = run(&mut r, 12);
    assert_eq!(actions[10], VoiceAction::TimedOut { failed_attempts: 10 });
    assert_eq!(actions[11], VoiceAction::None);
    assert_eq!(r.task.session().state(), SessionState::Dormant);
    assert!(!r.state.armed());
    assert_eq!(r.sink.count(|e| matches!(e, AppEvent::VoiceTimedOut { .. })), 1);
}

#[test]
fn silence_does_not_count_against_the_session() {
    let mut outcomes = vec![text("hey jarvis")];
    outcomes.extend((0..20).map(|_| ListenOutcome::NoSpeech));
    outcomes.push(text("lock system"));
    let mut r = rig(outcomes);

    let actions = run(&mut r, 22);
    assert_eq!(actions[21], VoiceAction::Command(VoiceCommand::Lock));
    assert!(r.state.armed());
}

#[test]
fn service_errors_leave_state_alone() {
    let mut r = rig(vec![
        text("hey jarvis"),
        ListenOutcome::ServiceError("connection refused".into()),
        text("lock system"),
    ]);
    let actions = run(&mut r, 3);
    assert_eq!(actions[1], VoiceAction::ServiceError);
    assert_eq!(actions[2], VoiceAction::Command(VoiceCommand::Lock));
}

#[test]
fn cue_failure_still_applies_the_command() {
    let player = MockPlayer {
        fail: true,
        ..MockPlayer::default()
    };
    let mut r = rig_with(vec![text("hey jarvis"), text("lock system")], player);
    run(&mut r, 2);
    assert!(r.state.armed());
    assert_eq!(r.player.urls().len(), 2);
}
