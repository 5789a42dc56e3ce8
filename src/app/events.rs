//! Outbound application events.
//!
//! The task loops emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (today: one log line each).

use core::fmt;

use crate::alert::DispatchReport;
use crate::link::payload::{NotificationPayload, StatusReport};

use super::commands::VoiceCommand;

/// What raised a break-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakInSource {
    /// Sustained motion while armed.
    Motion,
    /// The BLE peer flagged a potential break-in.
    Peer,
}

impl fmt::Display for BreakInSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion => write!(f, "motion"),
            Self::Peer => write!(f, "peer"),
        }
    }
}

/// Who changed the armed flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmSource {
    Peer,
    Voice,
}

/// Structured events emitted by the coordinator.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A task loop started.
    Started { task: &'static str },

    /// `armed` was written (it may not have changed value).
    ArmedChanged { armed: bool, source: ArmSource },

    /// Handshake finished; notifications are flowing.
    LinkUp,

    /// The session was torn down.
    LinkDown { reason: String },

    /// A valid notification was applied to system state.
    NotificationApplied(NotificationPayload),

    /// A status string was written to the peer.
    StatusPushed(StatusReport),

    /// The motion line changed level.
    MotionEdge { present: bool },

    /// A break-in is about to be dispatched.
    BreakIn(BreakInSource),

    /// A dispatch ran to completion.
    AlertFinished(DispatchReport),

    /// A break-in arrived while another dispatch was in flight.
    AlertSkipped(BreakInSource),

    /// The wake phrase was heard.
    VoiceWoke,

    /// A voice command was executed.
    VoiceCommand(VoiceCommand),

    /// Too many unrecognised utterances; back to dormant.
    VoiceTimedOut { failed_attempts: u32 },
}
