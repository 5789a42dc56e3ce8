//! End-to-end scenarios: tasks wired to a real dispatcher over mock I/O.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use homeguard::alert::AlertDispatcher;
use homeguard::app::events::{AppEvent, BreakInSource};
use homeguard::config::{AlertConfig, BleConfig, MotionConfig, TimingConfig, VoiceConfig};
use homeguard::link::{BleLinkSupervisor, LinkPhase};
use homeguard::motion::MotionMonitor;
use homeguard::state::SharedSystemState;
use homeguard::voice::VoiceTask;

use crate::mock_hw::{
    MockCentral, MockNotifier, MockPlayer, MockRecorder, RecordingSink, ScriptedPin,
    ScriptedTranscriber, text, virtual_time,
};

type Dispatcher = AlertDispatcher<MockPlayer, MockRecorder, MockNotifier>;

struct Pipeline {
    state: SharedSystemState,
    dispatcher: Arc<Dispatcher>,
    player: MockPlayer,
    recorder: MockRecorder,
    notifier: MockNotifier,
}

fn pipeline() -> Pipeline {
    let state = SharedSystemState::new();
    let player = MockPlayer::default();
    let recorder = MockRecorder::default();
    let notifier = MockNotifier::default();
    let dispatcher = Arc::new(AlertDispatcher::new(
        state.clone(),
        player.clone(),
        recorder.clone(),
        notifier.clone(),
        AlertConfig::default(),
    ));
    Pipeline {
        state,
        dispatcher,
        player,
        recorder,
        notifier,
    }
}

#[test]
fn armed_sustained_motion_raises_one_full_alert() {
    let p = pipeline();
    p.state.set_armed(true);
    let (clock, delay) = virtual_time();
    let sink = RecordingSink::default();
    let mut monitor = MotionMonitor::new(
        ScriptedPin::new(&clock, &[(0, 7000)]),
        clock.clone(),
        delay,
        Arc::clone(&p.dispatcher),
        sink.clone(),
        p.state.clone(),
        &MotionConfig::default(),
    );

    while clock.now() < 12_000 {
        monitor.step();
    }

    assert_eq!(p.player.urls(), vec![AlertConfig::default().warning_audio_url]);
    assert_eq!(p.recorder.recordings.load(Ordering::SeqCst), 1);
    assert_eq!(p.notifier.sms_count(), 1);
    assert_eq!(p.notifier.call_count(), 1);
    let s = p.state.snapshot();
    assert!(s.motion_detected);
    assert!(!s.alert_in_flight);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::AlertFinished(r) if r.source == BreakInSource::Motion)),
        1
    );
}

#[test]
fn peer_break_in_arms_and_alerts_then_status_reports_it() {
    let p = pipeline();
    let central = MockCentral::default();
    let (_clock, delay) = virtual_time();
    let timing = TimingConfig {
        notification_wait_ms: 10,
        ..TimingConfig::default()
    };
    let mut sup = BleLinkSupervisor::new(
        central.clone(),
        Arc::clone(&p.dispatcher),
        delay,
        RecordingSink::default(),
        p.state.clone(),
        BleConfig::default(),
        timing,
    );
    while sup.step() != LinkPhase::Active {}

    assert!(central.notify(b"0,1"));
    sup.step();
    assert!(p.state.armed());
    assert_eq!(p.notifier.sms_count(), 1);
    assert!(p.state.motion_detected());

    // Next quiet cycle reports motion, armed, not deactivated.
    sup.step();
    assert_eq!(central.writes().last().unwrap().data, b"1,1,0".to_vec());
    assert!(!p.state.motion_detected());
}

#[test]
fn voice_lock_arms_motion_pipeline_and_deactivate_disarms_it() {
    let p = pipeline();
    let (clock, delay) = virtual_time();

    let mut voice = VoiceTask::new(
        ScriptedTranscriber::new(vec![text("hey jarvis"), text("lock system")]),
        MockPlayer::default(),
        delay.clone(),
        RecordingSink::default(),
        p.state.clone(),
        VoiceConfig::default(),
        &TimingConfig::default(),
    );
    voice.step();
    voice.step();
    assert!(p.state.armed());

    let start = clock.now();
    let mut monitor = MotionMonitor::new(
        ScriptedPin::new(&clock, &[(start, start + 7000)]),
        clock.clone(),
        delay.clone(),
        Arc::clone(&p.dispatcher),
        RecordingSink::default(),
        p.state.clone(),
        &MotionConfig::default(),
    );
    while clock.now() < start + 8000 {
        monitor.step();
    }
    assert_eq!(p.notifier.sms_count(), 1);

    let mut voice = VoiceTask::new(
        ScriptedTranscriber::new(vec![text("hey jarvis"), text("deactivate system")]),
        MockPlayer::default(),
        delay,
        RecordingSink::default(),
        p.state.clone(),
        VoiceConfig::default(),
        &TimingConfig::default(),
    );
    voice.step();
    voice.step();
    assert!(!p.state.armed());
}

#[test]
fn garbled_session_leaves_arming_untouched() {
    let p = pipeline();
    let (_clock, delay) = virtual_time();
    let mut outcomes = vec![text("hey jarvis"), text("lock system")];
    outcomes.extend((0..10).map(|_| text("mumble")));
    let mut voice = VoiceTask::new(
        ScriptedTranscriber::new(outcomes),
        MockPlayer::default(),
        delay,
        RecordingSink::default(),
        p.state.clone(),
        VoiceConfig::default(),
        &TimingConfig::default(),
    );

    voice.step();
    voice.step();
    assert!(p.state.armed());
    assert!(voice.session().is_active());

    for _ in 0..9 {
        voice.step();
    }
    assert!(voice.session().is_active());
    voice.step();
    assert!(!voice.session().is_active());
    assert!(p.state.armed());
}
