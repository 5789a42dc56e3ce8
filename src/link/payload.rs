//! Wire formats exchanged with the BLE peer.
//!
//! Inbound (notify characteristic): `"<systemActivated>,<potentialBreakIn>"`.
//! Outbound (write characteristic): `"<motionDetected>,<armed>,<deactivated>"`.
//! All fields are the ASCII digits `0` or `1`.

use core::fmt::{self, Write as _};

use crate::error::PayloadError;
use crate::state::SystemState;

/// Number of comma-separated fields in an inbound notification.
const NOTIFICATION_FIELDS: usize = 2;

/// Capacity of an encoded status string (`"1,1,0"` plus slack).
pub const STATUS_CAPACITY: usize = 8;

/// A decoded notification from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Raw `systemActivated` bit.  `false` arms the system, `true` disarms it.
    pub system_activated: bool,
    pub potential_break_in: bool,
}

impl NotificationPayload {
    /// Parse a raw notification value.
    ///
    /// Surrounding whitespace and trailing NULs are ignored, as is
    /// whitespace around each field.  Anything else that is not exactly two
    /// `0`/`1` integers is rejected.
    pub fn parse(raw: &[u8]) -> Result<Self, PayloadError> {
        let text = core::str::from_utf8(raw).map_err(|_| PayloadError::InvalidUtf8)?;
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

        let arity = text.split(',').count();
        let Some((activated, break_in)) = text
            .split_once(',')
            .filter(|_| arity == NOTIFICATION_FIELDS)
        else {
            return Err(PayloadError::WrongArity(arity));
        };

        Ok(Self {
            system_activated: parse_bit(activated)?,
            potential_break_in: parse_bit(break_in)?,
        })
    }
}

fn parse_bit(field: &str) -> Result<bool, PayloadError> {
    let value: i64 = field.trim().parse().map_err(|_| PayloadError::NotInteger)?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PayloadError::OutOfRange(other)),
    }
}

impl fmt::Display for NotificationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            u8::from(self.system_activated),
            u8::from(self.potential_break_in)
        )
    }
}

/// Periodic status pushed to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub motion_detected: bool,
    pub armed: bool,
}

impl StatusReport {
    pub fn from_state(state: &SystemState) -> Self {
        Self {
            motion_detected: state.motion_detected,
            armed: state.armed,
        }
    }

    /// Encode as the wire string.  The third field is always `!armed`.
    pub fn encode(&self) -> heapless::String<STATUS_CAPACITY> {
        let mut out = heapless::String::new();
        // Five ASCII bytes always fit.
        let _ = write!(out, "{self}");
        out
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}",
            u8::from(self.motion_detected),
            u8::from(self.armed),
            u8::from(!self.armed)
        )
    }
}
