//! BLE link supervisor against a mock central.

use homeguard::app::events::AppEvent;
use homeguard::config::{BleConfig, TimingConfig};
use homeguard::link::{BleLinkSupervisor, LinkPhase, NOTIFY_ENABLE};
use homeguard::state::SharedSystemState;

use crate::mock_hw::{
    CountingHandler, MockCentral, NOTIFY_HANDLE, RecordingSink, VirtualDelay, WRITE_HANDLE, Write,
    virtual_time,
};

type Supervisor = BleLinkSupervisor<MockCentral, CountingHandler, VirtualDelay, RecordingSink>;

struct Rig {
    sup: Supervisor,
    central: MockCentral,
    handler: CountingHandler,
    delay: VirtualDelay,
    sink: RecordingSink,
    state: SharedSystemState,
}

fn rig(central: MockCentral) -> Rig {
    let (_clock, delay) = virtual_time();
    let handler = CountingHandler::default();
    let sink = RecordingSink::default();
    let state = SharedSystemState::new();
    let timing = TimingConfig {
        notification_wait_ms: 10,
        ..TimingConfig::default()
    };
    let sup = BleLinkSupervisor::new(
        central.clone(),
        handler.clone(),
        delay.clone(),
        sink.clone(),
        state.clone(),
        BleConfig::default(),
        timing,
    );
    Rig {
        sup,
        central,
        handler,
        delay,
        sink,
        state,
    }
}

fn bring_up(r: &mut Rig) {
    for _ in 0..10 {
        if r.sup.step() == LinkPhase::Active {
            return;
        }
    }
    panic!("link never became active");
}

#[test]
fn connect_failures_back_off_and_retry() {
    let mut r = rig(MockCentral::failing(2));
    let phases: Vec<LinkPhase> = (0..7).map(|_| r.sup.step()).collect();
    assert_eq!(
        phases,
        vec![
            LinkPhase::Connecting,
            LinkPhase::Disconnected,
            LinkPhase::Connecting,
            LinkPhase::Disconnected,
            LinkPhase::Connecting,
            LinkPhase::Handshaking,
            LinkPhase::Active,
        ]
    );
    assert_eq!(r.delay.sleeps(), vec![1000, 1000]);
    assert_eq!(r.central.log.lock().unwrap().connect_attempts, 3);
}

#[test]
fn handshake_enables_notifications_on_descriptor() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);
    assert_eq!(
        r.central.writes(),
        vec![Write {
            handle: NOTIFY_HANDLE + 1,
            data: NOTIFY_ENABLE.to_vec(),
            with_response: true,
        }]
    );
    let session = r.sup.session().unwrap();
    assert!(session.is_connected());
    assert_eq!(session.write_handle, WRITE_HANDLE);
    assert_eq!(session.notify_handle, NOTIFY_HANDLE);
    assert_eq!(r.sink.count(|e| matches!(e, AppEvent::LinkUp)), 1);
}

#[test]
fn missing_service_tears_down_and_retries() {
    let central = MockCentral::default();
    central.log.lock().unwrap().missing_service = true;
    let mut r = rig(central);

    assert_eq!(r.sup.step(), LinkPhase::Connecting);
    assert_eq!(r.sup.step(), LinkPhase::Handshaking);
    assert_eq!(r.sup.step(), LinkPhase::Disconnected);
    assert!(r.sup.session().is_none());
    assert_eq!(r.central.log.lock().unwrap().disconnects, 1);
    assert!(r.central.writes().is_empty());
    assert_eq!(r.sink.count(|e| matches!(e, AppEvent::LinkDown { .. })), 1);

    assert_eq!(r.sup.step(), LinkPhase::Connecting);
    assert_eq!(r.delay.sleeps(), vec![1000]);
}

#[test]
fn notifications_set_armed_with_inverted_polarity() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);

    assert!(r.central.notify(b"0,1"));
    assert_eq!(r.sup.step(), LinkPhase::Active);
    assert!(r.state.armed());
    assert_eq!(r.handler.count(), 1);

    assert!(r.central.notify(b"1,0"));
    assert_eq!(r.sup.step(), LinkPhase::Active);
    assert!(!r.state.armed());
    assert_eq!(r.handler.count(), 1);
    assert_eq!(r.sink.count(|e| matches!(e, AppEvent::AlertFinished(_))), 1);
}

#[test]
fn invalid_notifications_change_nothing() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);

    assert!(!r.central.notify(b"abc,1"));
    assert!(!r.central.notify(b"1"));
    // Nothing queued, so the wait times out and status is pushed.
    assert_eq!(r.sup.step(), LinkPhase::Active);
    assert!(!r.state.armed());
    assert_eq!(r.handler.count(), 0);
    assert_eq!(r.central.writes().len(), 2);
}

#[test]
fn silence_pushes_status_then_clears_motion() {
    let mut r = rig(MockCentral::default());
    r.state.set_armed(true);
    r.state.set_motion_detected(true);
    bring_up(&mut r);

    assert_eq!(r.sup.step(), LinkPhase::Active);
    assert_eq!(
        r.central.writes().last(),
        Some(&Write {
            handle: WRITE_HANDLE,
            data: b"1,1,0".to_vec(),
            with_response: true,
        })
    );
    assert!(!r.state.motion_detected());
    assert_eq!(r.delay.sleeps().last(), Some(&2000));

    r.sup.step();
    assert_eq!(r.central.writes().last().unwrap().data, b"0,1,0".to_vec());
}

#[test]
fn motion_raised_during_a_status_write_reaches_the_next_report() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);
    r.central.log.lock().unwrap().motion_during_write = Some(r.state.clone());

    assert_eq!(r.sup.step(), LinkPhase::Active);
    assert_eq!(r.central.writes().last().unwrap().data, b"0,0,1".to_vec());
    assert!(r.state.motion_detected());

    assert_eq!(r.sup.step(), LinkPhase::Active);
    assert_eq!(r.central.writes().last().unwrap().data, b"1,0,1".to_vec());
    assert!(!r.state.motion_detected());
}

#[test]
fn write_failure_reconnects_without_clearing_motion() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);
    r.state.set_motion_detected(true);
    r.central.log.lock().unwrap().fail_writes = true;

    assert_eq!(r.sup.step(), LinkPhase::Disconnected);
    assert!(r.sup.session().is_none());
    assert_eq!(r.central.log.lock().unwrap().disconnects, 1);
    assert!(r.state.motion_detected());

    r.central.log.lock().unwrap().fail_writes = false;
    bring_up(&mut r);
    assert_eq!(r.central.log.lock().unwrap().connect_attempts, 2);
    assert_eq!(r.delay.sleeps(), vec![1000]);
}

#[test]
fn dropped_link_returns_to_disconnected() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);
    r.central.drop_link();
    assert_eq!(r.sup.step(), LinkPhase::Disconnected);
    assert_eq!(r.central.log.lock().unwrap().disconnects, 1);
}

#[test]
fn events_from_a_dead_session_are_discarded() {
    let mut r = rig(MockCentral::default());
    bring_up(&mut r);
    r.central.drop_link();
    r.central.notify(b"0,1");
    assert_eq!(r.sup.step(), LinkPhase::Disconnected);

    bring_up(&mut r);
    assert_eq!(r.handler.count(), 0);
    assert!(!r.state.armed());
}
