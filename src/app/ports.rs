//! Port traits: the hexagonal boundary between the coordinator and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ task loop (domain)
//! ```
//!
//! Adapters under [`crate::adapters`] implement these traits and the test
//! suite ships mock versions.  Nothing in [`crate::link`], [`crate::motion`],
//! [`crate::voice`] or [`crate::alert`] touches a device, process or socket
//! directly.
//!
//! Two further seams come from `embedded-hal`: motion input is an
//! [`InputPin`](embedded_hal::digital::InputPin) and every sleep goes
//! through [`DelayNs`](embedded_hal::delay::DelayNs).

use core::time::Duration;
use std::path::PathBuf;

use crate::alert::DispatchOutcome;
use crate::error::{CollaboratorError, LinkError};
use crate::link::queue::NotificationSender;

use super::events::{AppEvent, BreakInSource};

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic clock.
pub trait TimePort {
    /// Milliseconds since an arbitrary fixed origin.
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The task loops emit structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// BLE ports
// ───────────────────────────────────────────────────────────────

/// Opens connections to a peripheral.
pub trait BleCentral {
    type Link: BleLink;

    /// Connect to `peer`.  The link pushes parsed notifications and a
    /// drop event into `events` for as long as it lives.
    fn connect(&mut self, peer: &str, events: NotificationSender) -> Result<Self::Link, LinkError>;
}

/// An open connection to the peripheral.
pub trait BleLink {
    /// Resolve `characteristic` inside `service` and return its value handle.
    ///
    /// Fails with [`LinkError::ServiceNotFound`] or
    /// [`LinkError::CharacteristicNotFound`].
    fn find_characteristic(&mut self, service: &str, characteristic: &str) -> Result<u16, LinkError>;

    /// Write `data` to the attribute at `handle`.
    fn write(&mut self, handle: u16, data: &[u8], with_response: bool) -> Result<(), LinkError>;

    /// Close the connection.  Idempotent.
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Voice ports
// ───────────────────────────────────────────────────────────────

/// Result of one bounded listen-and-transcribe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Speech was captured and transcribed.
    Text(String),
    /// Speech was captured but could not be understood.
    Unintelligible,
    /// The recognition service could not be reached or failed.
    ServiceError(String),
    /// No speech started before the listen timeout.
    NoSpeech,
}

pub trait Transcriber {
    /// Adjust for ambient noise before the first listen.
    fn calibrate(&mut self) -> Result<(), CollaboratorError>;

    /// Wait up to `timeout` for speech to start, capture at most
    /// `phrase_limit` of it, and transcribe.
    fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> ListenOutcome;
}

// ───────────────────────────────────────────────────────────────
// Alert collaborator ports
// ───────────────────────────────────────────────────────────────
//
// These run on scoped threads during a dispatch, hence `Sync`.

/// Fetches and plays a remote audio clip.
pub trait AudioPlayer: Send + Sync {
    fn play_url(&self, url: &str) -> Result<(), CollaboratorError>;
}

/// Records a clip and returns the path of the finished MP4.
pub trait VideoRecorder: Send + Sync {
    fn record(&self, duration: Duration) -> Result<PathBuf, CollaboratorError>;
}

/// SMS and voice-call delivery.  Both return the provider's delivery id.
pub trait Notifier: Send + Sync {
    fn send_sms(&self, to: &str, body: &str) -> Result<String, CollaboratorError>;
    fn place_call(&self, to: &str) -> Result<String, CollaboratorError>;
}

// ───────────────────────────────────────────────────────────────
// Break-in handler (link / motion → alert pipeline)
// ───────────────────────────────────────────────────────────────

/// Entry point of the alert pipeline.  Shared by the link and motion tasks.
pub trait BreakInHandler: Send + Sync {
    /// Run (or skip) one dispatch.  Blocks until the dispatch finishes.
    fn on_break_in(&self, source: BreakInSource) -> DispatchOutcome;
}

impl<H: BreakInHandler + ?Sized> BreakInHandler for std::sync::Arc<H> {
    fn on_break_in(&self, source: BreakInSource) -> DispatchOutcome {
        (**self).on_break_in(source)
    }
}
