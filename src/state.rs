//! Process-wide security state shared by the three long-running tasks.
//!
//! ```text
//!  ┌──────────────┐  apply_notification ┌───────────────────┐
//!  │ BLE link     │────────────────────▶│                   │
//!  ├──────────────┤  set_motion_detected│ SharedSystemState │
//!  │ Motion task  │────────────────────▶│  Mutex<SystemState>│
//!  ├──────────────┤  set_armed          │                   │
//!  │ Voice task   │────────────────────▶│                   │
//!  └──────────────┘                     └───────────────────┘
//!                      try_begin_alert ▲
//!                  AlertDispatcher ────┘
//! ```
//!
//! Every operation takes the lock for the duration of a few flag writes and
//! never across I/O.  A poisoned lock is recovered: the state is three
//! plain booleans and is always internally consistent.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::link::payload::{NotificationPayload, StatusReport};

/// Consistent snapshot of the shared flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemState {
    pub armed: bool,
    pub motion_detected: bool,
    pub alert_in_flight: bool,
}

/// Cloneable handle to the single [`SystemState`] instance.
#[derive(Debug, Clone, Default)]
pub struct SharedSystemState {
    inner: Arc<Mutex<SystemState>>,
}

impl SharedSystemState {
    /// Fresh state: disarmed, no motion, no alert.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SystemState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SystemState {
        *self.lock()
    }

    pub fn armed(&self) -> bool {
        self.lock().armed
    }

    /// Returns the previous value.
    pub fn set_armed(&self, armed: bool) -> bool {
        core::mem::replace(&mut self.lock().armed, armed)
    }

    pub fn motion_detected(&self) -> bool {
        self.lock().motion_detected
    }

    pub fn set_motion_detected(&self, detected: bool) {
        self.lock().motion_detected = detected;
    }

    pub fn alert_in_flight(&self) -> bool {
        self.lock().alert_in_flight
    }

    /// Apply a peer notification under one lock hold.
    ///
    /// `system_activated == 0` arms, `1` disarms.  Returns `true` when the
    /// payload flags a potential break-in; the caller runs the break-in
    /// path after the lock is released.
    pub fn apply_notification(&self, payload: &NotificationPayload) -> bool {
        let mut s = self.lock();
        s.armed = !payload.system_activated;
        payload.potential_break_in
    }

    /// Build the status report and clear `motion_detected` under one lock
    /// hold, so a break-in recorded while the report is on the wire is kept
    /// for the next report.
    pub fn take_status_report(&self) -> StatusReport {
        let mut s = self.lock();
        let report = StatusReport::from_state(&s);
        s.motion_detected = false;
        report
    }

    /// Put back a `motion_detected` taken by a report that never reached
    /// the peer.
    pub fn restore_status_report(&self, report: &StatusReport) {
        if report.motion_detected {
            self.lock().motion_detected = true;
        }
    }

    /// Compare-and-set `alert_in_flight` from false to true.
    ///
    /// `None` means another dispatch is already running.  The returned
    /// guard clears the flag when dropped, including during unwinding.
    pub fn try_begin_alert(&self) -> Option<AlertGuard> {
        let mut s = self.lock();
        if s.alert_in_flight {
            return None;
        }
        s.alert_in_flight = true;
        Some(AlertGuard {
            state: self.clone(),
            completed: false,
        })
    }
}

/// Proof that the holder owns the single in-flight alert slot.
#[derive(Debug)]
pub struct AlertGuard {
    state: SharedSystemState,
    completed: bool,
}

impl AlertGuard {
    /// Finish the dispatch: sets `motion_detected` and clears
    /// `alert_in_flight` in one update.
    pub fn complete(mut self) {
        let mut s = self.state.lock();
        s.motion_detected = true;
        s.alert_in_flight = false;
        self.completed = true;
    }
}

impl Drop for AlertGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.state.lock().alert_in_flight = false;
        }
    }
}
