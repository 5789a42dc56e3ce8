//! BLE central adapter over an interactive `gatttool` helper.
//!
//! Implements [`BleCentral`] / [`BleLink`] by driving `gatttool -b <peer> -I`
//! through its stdin and parsing its stdout.
//!
//! ```text
//!  GattToolLink ──stdin──▶ gatttool ──stdout──▶ reader thread
//!       ▲                                         │   │
//!       └──────────── replies channel ────────────┘   │
//!                       NotificationSender ◀──────────┘
//! ```
//!
//! The reader thread classifies every line with [`parse_gatt_line`]:
//! notifications go to the supervisor's link channel, command replies go
//! to the link's reply channel, and EOF or a disconnect message becomes a
//! link-dropped event.  Closing stdin makes `gatttool` exit.
//!
//! ## Command / reply pairs
//!
//! | Command                        | Success line                              |
//! |--------------------------------|-------------------------------------------|
//! | `connect`                      | `Connection successful`                   |
//! | `primary <uuid>`               | `Starting handle: 0x.. Ending handle: 0x..` |
//! | `characteristics <s> <e> <uuid>` | `handle: .., char value handle: 0x.., uuid: ..` |
//! | `char-write-req <h> <hex>`     | `Characteristic value was written successfully` |

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use super::utils::{hex_string, parse_hex_bytes, strip_ansi};
use crate::app::ports::{BleCentral, BleLink};
use crate::error::LinkError;
use crate::link::queue::{NotificationSender, receive_within};

const REPLY_DEPTH: usize = 32;

type ReplyChannel = Channel<CriticalSectionRawMutex, GattLine, REPLY_DEPTH>;

// ───────────────────────────────────────────────────────────────
// Output line classification
// ───────────────────────────────────────────────────────────────

/// One classified line of `gatttool` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattLine {
    Connected,
    ConnectError(String),
    ServiceRange { start: u16, end: u16 },
    Characteristic { value_handle: u16, uuid: String },
    WriteOk,
    Notification { handle: u16, value: Vec<u8> },
    Disconnected,
    Error(String),
    Other,
}

fn parse_handle(s: &str) -> Option<u16> {
    let s = s.trim();
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u16::from_str_radix(hex, 16).ok()
}

/// Classify one raw output line (ANSI codes and prompt are stripped here).
pub fn parse_gatt_line(raw: &str) -> GattLine {
    let cleaned = strip_ansi(raw);
    let mut line = cleaned.trim();
    if line.starts_with('[') {
        if let Some(i) = line.rfind("> ") {
            line = line[i + 2..].trim();
        }
    }
    if line.is_empty() {
        return GattLine::Other;
    }

    if line.contains("Connection successful") {
        return GattLine::Connected;
    }

    if let Some(rest) = line
        .strip_prefix("Notification handle =")
        .or_else(|| line.strip_prefix("Indication   handle ="))
    {
        let Some((handle, value)) = rest.split_once("value:") else {
            return GattLine::Other;
        };
        return match (parse_handle(handle), parse_hex_bytes(value)) {
            (Some(handle), Some(value)) => GattLine::Notification { handle, value },
            _ => GattLine::Other,
        };
    }

    if let Some(rest) = line.strip_prefix("Starting handle:") {
        let Some((start, end)) = rest.split_once("Ending handle:") else {
            return GattLine::Other;
        };
        return match (parse_handle(start), parse_handle(end)) {
            (Some(start), Some(end)) => GattLine::ServiceRange { start, end },
            _ => GattLine::Other,
        };
    }

    if line.starts_with("handle:") && line.contains("char value handle:") {
        let mut value_handle = None;
        let mut uuid = None;
        for field in line.split(',') {
            if let Some(v) = field.trim().strip_prefix("char value handle:") {
                value_handle = parse_handle(v);
            } else if let Some(v) = field.trim().strip_prefix("uuid:") {
                uuid = Some(v.trim().to_lowercase());
            }
        }
        return match (value_handle, uuid) {
            (Some(value_handle), Some(uuid)) => GattLine::Characteristic { value_handle, uuid },
            _ => GattLine::Other,
        };
    }

    if line.contains("written successfully") {
        return GattLine::WriteOk;
    }
    if line.contains("connect error") || line.starts_with("Error: connect") {
        return GattLine::ConnectError(line.to_owned());
    }
    if line.contains("Disconnected") || line.contains("Invalid file descriptor") {
        return GattLine::Disconnected;
    }
    if line.starts_with("Error") || line.contains("failed") {
        return GattLine::Error(line.to_owned());
    }
    GattLine::Other
}

// ───────────────────────────────────────────────────────────────
// Central
// ───────────────────────────────────────────────────────────────

/// Spawns one `gatttool` process per connection.
pub struct GattToolCentral {
    program: String,
    request_timeout: Duration,
}

impl GattToolCentral {
    pub fn new(program: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            request_timeout,
        }
    }
}

impl BleCentral for GattToolCentral {
    type Link = GattToolLink;

    fn connect(&mut self, peer: &str, events: NotificationSender) -> Result<GattToolLink, LinkError> {
        let mut child = Command::new(&self.program)
            .args(["-b", peer, "-I"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LinkError::Io(format!("spawn {}: {e}", self.program)))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LinkError::Io("helper pipes unavailable".into()));
        };

        let replies: Arc<ReplyChannel> = Arc::new(Channel::new());
        let reader_replies = Arc::clone(&replies);
        let spawned = std::thread::Builder::new()
            .name("gatttool-rx".into())
            .spawn(move || reader_loop(BufReader::new(stdout), &events, &reader_replies));
        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LinkError::Io(format!("reader thread: {e}")));
        }

        let mut link = GattToolLink {
            child,
            stdin: Some(stdin),
            replies,
            timeout: self.request_timeout,
            closed: false,
        };

        link.send("connect")?;
        link.await_reply(|line| match line {
            GattLine::Connected => Some(Ok(())),
            GattLine::ConnectError(why) | GattLine::Error(why) => {
                Some(Err(LinkError::ConnectFailed(why.clone())))
            }
            _ => None,
        })
        .map_err(|e| match e {
            LinkError::Timeout => LinkError::ConnectFailed("timed out".into()),
            other => other,
        })?;
        Ok(link)
    }
}

fn reader_loop<R: BufRead>(reader: R, events: &NotificationSender, replies: &ReplyChannel) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        match parse_gatt_line(&line) {
            GattLine::Notification { handle, value } => {
                debug!("BLE: notification on 0x{:04x}", handle);
                events.push_raw(&value);
            }
            GattLine::Disconnected => {
                events.link_dropped();
            }
            GattLine::Other => {}
            reply => {
                if replies.try_send(reply).is_err() {
                    warn!("BLE: reply channel full, dropping helper output");
                }
            }
        }
    }
    debug!("BLE: helper output closed");
    events.link_dropped();
}

// ───────────────────────────────────────────────────────────────
// Link
// ───────────────────────────────────────────────────────────────

/// A connected `gatttool` session.
pub struct GattToolLink {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Arc<ReplyChannel>,
    timeout: Duration,
    closed: bool,
}

impl GattToolLink {
    fn send(&mut self, command: &str) -> Result<(), LinkError> {
        // Replies to earlier, abandoned requests must not satisfy this one.
        while self.replies.try_receive().is_ok() {}
        let stdin = self.stdin.as_mut().ok_or(LinkError::NotConnected)?;
        writeln!(stdin, "{command}")
            .and_then(|()| stdin.flush())
            .map_err(|e| LinkError::Io(e.to_string()))
    }

    fn await_reply<T>(
        &self,
        mut matcher: impl FnMut(&GattLine) -> Option<Result<T, LinkError>>,
    ) -> Result<T, LinkError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(LinkError::Timeout);
            }
            let Some(line) = receive_within(&self.replies, left) else {
                return Err(LinkError::Timeout);
            };
            if let Some(result) = matcher(&line) {
                return result;
            }
        }
    }
}

impl BleLink for GattToolLink {
    fn find_characteristic(&mut self, service: &str, characteristic: &str) -> Result<u16, LinkError> {
        self.send(&format!("primary {service}"))?;
        let (start, end) = self
            .await_reply(|line| match line {
                GattLine::ServiceRange { start, end } => Some(Ok((*start, *end))),
                GattLine::Error(_) => Some(Err(LinkError::ServiceNotFound)),
                _ => None,
            })
            .map_err(|e| match e {
                LinkError::Timeout => LinkError::ServiceNotFound,
                other => other,
            })?;

        let wanted = characteristic.to_lowercase();
        self.send(&format!("characteristics 0x{start:04x} 0x{end:04x} {characteristic}"))?;
        self.await_reply(|line| match line {
            GattLine::Characteristic { value_handle, uuid } if *uuid == wanted => {
                Some(Ok(*value_handle))
            }
            GattLine::Error(_) => Some(Err(LinkError::CharacteristicNotFound)),
            _ => None,
        })
        .map_err(|e| match e {
            LinkError::Timeout => LinkError::CharacteristicNotFound,
            other => other,
        })
    }

    fn write(&mut self, handle: u16, data: &[u8], with_response: bool) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::NotConnected);
        }
        let verb = if with_response {
            "char-write-req"
        } else {
            "char-write-cmd"
        };
        self.send(&format!("{verb} 0x{handle:04x} {}", hex_string(data)))?;
        if !with_response {
            return Ok(());
        }
        self.await_reply(|line| match line {
            GattLine::WriteOk => Some(Ok(())),
            GattLine::Error(why) => Some(Err(LinkError::WriteFailed(why.clone()))),
            _ => None,
        })
    }

    fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.send("disconnect");
        let _ = self.send("exit");
        // EOF on stdin ends the helper.
        self.stdin = None;
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                std::thread::sleep(Duration::from_millis(100));
                if !matches!(self.child.try_wait(), Ok(Some(_))) {
                    let _ = self.child.kill();
                }
                let _ = self.child.wait();
            }
        }
        info!("BLE: helper closed");
    }
}

impl Drop for GattToolLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
