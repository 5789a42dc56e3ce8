//! Alert dispatcher: fork/join, ordering and the single in-flight slot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use homeguard::alert::{AlertDispatcher, DispatchOutcome};
use homeguard::app::events::BreakInSource;
use homeguard::app::ports::{AudioPlayer, Notifier, VideoRecorder};
use homeguard::config::AlertConfig;
use homeguard::error::CollaboratorError;
use homeguard::state::SharedSystemState;

use crate::mock_hw::{MockNotifier, MockPlayer, MockRecorder};

/// Tracks how many channels are busy at once.
#[derive(Clone, Default)]
struct Overlap {
    busy: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Overlap {
    fn enter(&self) {
        let now = self.busy.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(150));
        self.busy.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AudioPlayer for Overlap {
    fn play_url(&self, _url: &str) -> Result<(), CollaboratorError> {
        self.enter();
        Ok(())
    }
}

impl VideoRecorder for Overlap {
    fn record(&self, _duration: Duration) -> Result<PathBuf, CollaboratorError> {
        self.enter();
        Ok(PathBuf::from("/tmp/overlap.mp4"))
    }
}

/// Notifier that checks the recorder already finished when it is called.
struct AfterRecording {
    recordings: Arc<AtomicUsize>,
    seen: Arc<AtomicUsize>,
}

impl Notifier for AfterRecording {
    fn send_sms(&self, _to: &str, _body: &str) -> Result<String, CollaboratorError> {
        self.seen
            .store(self.recordings.load(Ordering::SeqCst), Ordering::SeqCst);
        Ok("SM1".into())
    }

    fn place_call(&self, _to: &str) -> Result<String, CollaboratorError> {
        Ok("CA1".into())
    }
}

#[test]
fn audio_and_video_run_concurrently() {
    let overlap = Overlap::default();
    let d = AlertDispatcher::new(
        SharedSystemState::new(),
        overlap.clone(),
        overlap.clone(),
        MockNotifier::default(),
        AlertConfig::default(),
    );
    let DispatchOutcome::Completed(report) = d.dispatch(BreakInSource::Motion) else {
        panic!("expected a dispatch");
    };
    assert!(report.is_clean());
    assert_eq!(overlap.peak.load(Ordering::SeqCst), 2);
}

#[test]
fn notification_waits_for_warning_and_recording() {
    let recorder = MockRecorder {
        hold: Duration::from_millis(100),
        ..MockRecorder::default()
    };
    let seen = Arc::new(AtomicUsize::new(0));
    let d = AlertDispatcher::new(
        SharedSystemState::new(),
        MockPlayer::default(),
        recorder.clone(),
        AfterRecording {
            recordings: Arc::clone(&recorder.recordings),
            seen: Arc::clone(&seen),
        },
        AlertConfig::default(),
    );
    let DispatchOutcome::Completed(report) = d.dispatch(BreakInSource::Peer) else {
        panic!("expected a dispatch");
    };
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(report.sms_sid.as_deref(), Some("SM1"));
    assert_eq!(report.call_sid.as_deref(), Some("CA1"));
}

#[test]
fn report_carries_the_configured_recipient_and_clip() {
    let player = MockPlayer::default();
    let notifier = MockNotifier::default();
    let config = AlertConfig {
        notify_to: "+15550100".into(),
        video_duration_secs: 3,
        ..AlertConfig::default()
    };
    let d = AlertDispatcher::new(
        SharedSystemState::new(),
        player.clone(),
        MockRecorder::default(),
        notifier.clone(),
        config.clone(),
    );
    let DispatchOutcome::Completed(report) = d.dispatch(BreakInSource::Motion) else {
        panic!("expected a dispatch");
    };

    assert_eq!(report.video, Some(PathBuf::from("/tmp/clip-0-3s.mp4")));
    assert_eq!(player.urls(), vec![config.warning_audio_url.clone()]);
    assert_eq!(
        notifier.sms.lock().unwrap().as_slice(),
        &[("+15550100".to_owned(), config.sms_body.clone())]
    );
    assert_eq!(notifier.calls.lock().unwrap().as_slice(), &["+15550100".to_owned()]);
}

#[test]
fn failed_warning_still_notifies() {
    let notifier = MockNotifier::default();
    let d = AlertDispatcher::new(
        SharedSystemState::new(),
        MockPlayer {
            fail: true,
            ..MockPlayer::default()
        },
        MockRecorder::default(),
        notifier.clone(),
        AlertConfig::default(),
    );
    let DispatchOutcome::Completed(report) = d.dispatch(BreakInSource::Motion) else {
        panic!("expected a dispatch");
    };
    assert!(!report.audio_played);
    assert!(report.video.is_some());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].starts_with("audio: "));
    assert_eq!(notifier.sms_count(), 1);
    assert_eq!(notifier.call_count(), 1);
}

#[test]
fn simultaneous_triggers_dispatch_once() {
    let state = SharedSystemState::new();
    let recorder = MockRecorder {
        hold: Duration::from_millis(300),
        ..MockRecorder::default()
    };
    let notifier = MockNotifier::default();
    let d = Arc::new(AlertDispatcher::new(
        state.clone(),
        MockPlayer::default(),
        recorder.clone(),
        notifier.clone(),
        AlertConfig::default(),
    ));
    let start = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [BreakInSource::Motion, BreakInSource::Peer]
        .into_iter()
        .map(|source| {
            let d = Arc::clone(&d);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                d.dispatch(source)
            })
        })
        .collect();
    let outcomes: Vec<DispatchOutcome> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, DispatchOutcome::Completed(_)))
        .count();
    assert_eq!(completed, 1);
    assert!(outcomes.contains(&DispatchOutcome::Skipped));
    assert_eq!(recorder.recordings.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.sms_count(), 1);
    assert!(!state.alert_in_flight());
    assert!(state.motion_detected());
}

#[test]
fn slot_reopens_after_completion() {
    let notifier = MockNotifier::default();
    let d = AlertDispatcher::new(
        SharedSystemState::new(),
        MockPlayer::default(),
        MockRecorder::default(),
        notifier.clone(),
        AlertConfig::default(),
    );
    assert!(matches!(
        d.dispatch(BreakInSource::Motion),
        DispatchOutcome::Completed(_)
    ));
    assert!(matches!(
        d.dispatch(BreakInSource::Motion),
        DispatchOutcome::Completed(_)
    ));
    assert_eq!(notifier.sms_count(), 2);
}
