//! BLE link supervisor.
//!
//! Keeps one connection to the door peripheral alive forever:
//!
//! ```text
//!  Disconnected ──▶ Connecting ──▶ Handshaking ──▶ Active
//!       ▲               │               │            │
//!       └───────────────┴───── link error ───────────┘
//! ```
//!
//! - **Connecting** opens a link; a failure waits the backoff and retries.
//! - **Handshaking** resolves the two characteristics and writes `01 00`
//!   to the notify characteristic's configuration descriptor.
//! - **Active** waits (bounded) for a notification.  A notification updates
//!   the armed flag and may raise a break-in; silence pushes the status
//!   string, clears `motion_detected`, and sleeps the status interval.
//!
//! Each call to [`BleLinkSupervisor::step`] performs exactly one
//! transition, so every phase can be driven from a test.

pub mod payload;
pub mod queue;

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::events::{AppEvent, ArmSource, BreakInSource};
use crate::app::ports::{BleCentral, BleLink, BreakInHandler, EventSink};
use crate::alert::DispatchOutcome;
use crate::config::{BleConfig, TimingConfig};
use crate::error::LinkError;
use crate::state::SharedSystemState;

use payload::{NotificationPayload, StatusReport};
use queue::{LinkEvent, LinkEvents};

/// Written to the notify characteristic's CCCD to enable notifications.
pub const NOTIFY_ENABLE: [u8; 2] = [0x01, 0x00];

/// Supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Disconnected,
    Connecting,
    Handshaking,
    Active,
}

/// One live connection.  Recreated on every reconnect.
pub struct BleSession<L: BleLink> {
    pub peer_address: String,
    pub service_uuid: String,
    /// Value handle of the characteristic we write status to.
    pub write_handle: u16,
    /// Value handle of the characteristic the peer notifies on.
    pub notify_handle: u16,
    link: L,
    connected: bool,
}

impl<L: BleLink> BleSession<L> {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn push_status(&mut self, report: &StatusReport) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.link
            .write(self.write_handle, report.encode().as_bytes(), true)
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            self.link.disconnect();
        }
    }
}

impl<L: BleLink> Drop for BleSession<L> {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct BleLinkSupervisor<C: BleCentral, H, D, S> {
    central: C,
    handler: H,
    delay: D,
    sink: S,
    state: SharedSystemState,
    ble: BleConfig,
    timing: TimingConfig,
    events: LinkEvents,
    phase: LinkPhase,
    backoff_pending: bool,
    /// Connected but not yet handshaken.
    pending: Option<C::Link>,
    session: Option<BleSession<C::Link>>,
    attempts: u32,
}

impl<C, H, D, S> BleLinkSupervisor<C, H, D, S>
where
    C: BleCentral,
    H: BreakInHandler,
    D: DelayNs,
    S: EventSink,
{
    pub fn new(
        central: C,
        handler: H,
        delay: D,
        sink: S,
        state: SharedSystemState,
        ble: BleConfig,
        timing: TimingConfig,
    ) -> Self {
        Self {
            central,
            handler,
            delay,
            sink,
            state,
            ble,
            timing,
            events: LinkEvents::new(),
            phase: LinkPhase::Disconnected,
            backoff_pending: false,
            pending: None,
            session: None,
            attempts: 0,
        }
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&BleSession<C::Link>> {
        self.session.as_ref()
    }

    /// Perform one transition and return the new phase.
    pub fn step(&mut self) -> LinkPhase {
        self.phase = match self.phase {
            LinkPhase::Disconnected => self.step_disconnected(),
            LinkPhase::Connecting => self.step_connecting(),
            LinkPhase::Handshaking => self.step_handshaking(),
            LinkPhase::Active => self.step_active(),
        };
        self.phase
    }

    // ── Phases ───────────────────────────────────────────────

    fn step_disconnected(&mut self) -> LinkPhase {
        if self.backoff_pending {
            self.backoff_pending = false;
            self.delay.delay_ms(self.timing.reconnect_backoff_ms);
        }
        LinkPhase::Connecting
    }

    fn step_connecting(&mut self) -> LinkPhase {
        self.attempts += 1;
        let stale = self.events.clear();
        if stale > 0 {
            debug!("BLE: discarded {} stale link events", stale);
        }
        info!(
            "BLE: connecting to {} (attempt {})",
            self.ble.peer_address, self.attempts
        );
        match self
            .central
            .connect(&self.ble.peer_address, self.events.sender())
        {
            Ok(link) => {
                self.pending = Some(link);
                LinkPhase::Handshaking
            }
            Err(e) => {
                warn!(
                    "BLE: connect failed: {} (retry in {}ms)",
                    e, self.timing.reconnect_backoff_ms
                );
                self.backoff_pending = true;
                LinkPhase::Disconnected
            }
        }
    }

    fn step_handshaking(&mut self) -> LinkPhase {
        let Some(mut link) = self.pending.take() else {
            return LinkPhase::Connecting;
        };
        match handshake(&mut link, &self.ble) {
            Ok((write_handle, notify_handle)) => {
                info!(
                    "BLE: connected to {} (write=0x{:04x}, notify=0x{:04x})",
                    self.ble.peer_address, write_handle, notify_handle
                );
                self.session = Some(BleSession {
                    peer_address: self.ble.peer_address.clone(),
                    service_uuid: self.ble.service_uuid.clone(),
                    write_handle,
                    notify_handle,
                    link,
                    connected: true,
                });
                self.attempts = 0;
                self.sink.emit(&AppEvent::LinkUp);
                LinkPhase::Active
            }
            Err(e) => {
                link.disconnect();
                self.teardown(&format!("handshake failed: {e}"))
            }
        }
    }

    fn step_active(&mut self) -> LinkPhase {
        let wait = Duration::from_millis(u64::from(self.timing.notification_wait_ms));
        match self.events.receive_timeout(wait) {
            Some(LinkEvent::Notification(payload)) => {
                self.on_notification(payload);
                LinkPhase::Active
            }
            Some(LinkEvent::Dropped) => self.teardown("peer disconnected"),
            None => self.push_status(),
        }
    }

    // ── Active-phase work ────────────────────────────────────

    fn on_notification(&mut self, payload: NotificationPayload) {
        info!("BLE: notification {}", payload);
        let break_in = self.state.apply_notification(&payload);
        self.sink.emit(&AppEvent::NotificationApplied(payload));
        self.sink.emit(&AppEvent::ArmedChanged {
            armed: !payload.system_activated,
            source: ArmSource::Peer,
        });
        if break_in {
            self.sink.emit(&AppEvent::BreakIn(BreakInSource::Peer));
            match self.handler.on_break_in(BreakInSource::Peer) {
                DispatchOutcome::Completed(report) => {
                    self.sink.emit(&AppEvent::AlertFinished(report));
                }
                DispatchOutcome::Skipped => {
                    self.sink.emit(&AppEvent::AlertSkipped(BreakInSource::Peer));
                }
            }
        }
    }

    fn push_status(&mut self) -> LinkPhase {
        let report = self.state.take_status_report();
        let result = match self.session.as_mut() {
            Some(session) => session.push_status(&report),
            None => Err(LinkError::NotConnected),
        };
        match result {
            Ok(()) => {
                info!("BLE: status {}", report);
                self.sink.emit(&AppEvent::StatusPushed(report));
                self.delay.delay_ms(self.timing.status_interval_ms);
                LinkPhase::Active
            }
            Err(e) => {
                self.state.restore_status_report(&report);
                self.teardown(&format!("status write failed: {e}"))
            }
        }
    }

    fn teardown(&mut self, reason: &str) -> LinkPhase {
        warn!("BLE: link down: {}", reason);
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        if let Some(mut link) = self.pending.take() {
            link.disconnect();
        }
        self.backoff_pending = true;
        self.sink.emit(&AppEvent::LinkDown {
            reason: reason.into(),
        });
        LinkPhase::Disconnected
    }
}

/// Resolve both characteristics and enable notifications.
/// Returns `(write_handle, notify_handle)`.
fn handshake<L: BleLink>(link: &mut L, ble: &BleConfig) -> Result<(u16, u16), LinkError> {
    let write_handle = link.find_characteristic(&ble.service_uuid, &ble.write_char_uuid)?;
    let notify_handle = link.find_characteristic(&ble.service_uuid, &ble.notify_char_uuid)?;
    let cccd = notify_handle
        .checked_add(1)
        .ok_or(LinkError::CharacteristicNotFound)?;
    link.write(cccd, &NOTIFY_ENABLE, true)?;
    Ok((write_handle, notify_handle))
}
