//! Motion monitor on virtual time with a scripted PIR line.

use homeguard::app::events::{AppEvent, BreakInSource};
use homeguard::config::MotionConfig;
use homeguard::motion::{MotionMonitor, MotionVerdict};
use homeguard::state::SharedSystemState;

use crate::mock_hw::{
    CountingHandler, RecordingSink, ScriptedPin, VirtualClock, VirtualDelay, virtual_time,
};

type Monitor = MotionMonitor<ScriptedPin, VirtualClock, VirtualDelay, CountingHandler, RecordingSink>;

fn monitor(
    high: &[(u64, u64)],
    failures: &[u64],
    armed: bool,
) -> (Monitor, CountingHandler, RecordingSink, SharedSystemState, VirtualClock) {
    let (clock, delay) = virtual_time();
    let pin = ScriptedPin::new(&clock, high).failing_at(failures);
    let handler = CountingHandler::default();
    let sink = RecordingSink::default();
    let state = SharedSystemState::new();
    state.set_armed(armed);
    let m = MotionMonitor::new(
        pin,
        clock.clone(),
        delay,
        handler.clone(),
        sink.clone(),
        state.clone(),
        &MotionConfig::default(),
    );
    (m, handler, sink, state, clock)
}

fn run_for(m: &mut Monitor, clock: &VirtualClock, until_ms: u64) -> Vec<MotionVerdict> {
    let mut out = Vec::new();
    while clock.now() < until_ms {
        out.push(m.step());
    }
    out
}

#[test]
fn polls_every_hundred_milliseconds() {
    let (mut m, _, _, _, clock) = monitor(&[], &[], true);
    run_for(&mut m, &clock, 1000);
    assert_eq!(clock.now(), 1000);
}

#[test]
fn sustained_motion_while_armed_dispatches_once() {
    let (mut m, handler, sink, state, clock) = monitor(&[(0, 7000)], &[], true);
    let verdicts = run_for(&mut m, &clock, 10_000);

    assert_eq!(
        verdicts.iter().filter(|v| **v == MotionVerdict::BreakIn).count(),
        1
    );
    assert_eq!(handler.count(), 1);
    assert_eq!(handler.sources.lock().unwrap()[0], BreakInSource::Motion);
    assert!(state.motion_detected());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::MotionEdge { present: true })), 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::MotionEdge { present: false })), 1);
}

#[test]
fn six_seconds_exactly_is_not_enough() {
    // High for samples at 0..=6000 ms, low from 6100 ms on.
    let (mut m, handler, _, state, clock) = monitor(&[(0, 6001)], &[], true);
    run_for(&mut m, &clock, 10_000);
    assert_eq!(handler.count(), 0);
    assert!(!state.motion_detected());
}

#[test]
fn brief_gap_restarts_the_window() {
    // The sample at 4000 ms is low, so the window reopens at 4100 ms.
    let (mut m, handler, _, _, clock) = monitor(&[(0, 4000), (4100, 20_000)], &[], true);
    run_for(&mut m, &clock, 10_200);
    assert_eq!(handler.count(), 0);
    run_for(&mut m, &clock, 10_300);
    assert_eq!(handler.count(), 1);
}

#[test]
fn disarmed_motion_is_only_logged() {
    let (mut m, handler, sink, state, clock) = monitor(&[(0, 20_000)], &[], false);
    run_for(&mut m, &clock, 20_000);
    assert_eq!(handler.count(), 0);
    assert!(!state.motion_detected());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::BreakIn(_))), 0);
}

#[test]
fn read_errors_skip_the_sample_without_resetting() {
    let (mut m, handler, _, _, clock) = monitor(&[(0, 8000)], &[3000, 3100, 3200], true);
    run_for(&mut m, &clock, 6200);
    assert_eq!(handler.count(), 1);
    assert!(m.window().fired);
    assert_eq!(m.window().sustained_since, None);
}
