//! Link event channel between a BLE link's reader and the supervisor.
//!
//! The link adapter's reader thread parses notification values and pushes
//! them here; it never touches system state.  The supervisor drains the
//! channel with a bounded wait.
//!
//! ```text
//! ┌──────────────┐  LinkEvent  ┌──────────────────┐
//! │ Link reader  │────────────▶│ BleLinkSupervisor │
//! │ (thread)     │             │ (sync, bounded)   │
//! └──────────────┘             └──────────────────┘
//! ```

use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::payload::NotificationPayload;

/// Channel depth for link events.
pub const LINK_EVENT_DEPTH: usize = 16;

/// Something the link layer observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A valid notification arrived on the notify characteristic.
    Notification(NotificationPayload),
    /// The underlying connection went away.
    Dropped,
}

type LinkEventChannel = Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>;

/// Receiving side, owned by the supervisor.
pub struct LinkEvents {
    channel: Arc<LinkEventChannel>,
}

impl Default for LinkEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkEvents {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Channel::new()),
        }
    }

    /// Producer handle to give to a link.
    pub fn sender(&self) -> NotificationSender {
        NotificationSender {
            channel: Arc::clone(&self.channel),
        }
    }

    pub fn try_receive(&self) -> Option<LinkEvent> {
        self.channel.try_receive().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn receive_timeout(&self, timeout: Duration) -> Option<LinkEvent> {
        receive_within(&self.channel, timeout)
    }

    /// Discard anything left over from a previous session.
    pub fn clear(&self) -> usize {
        let mut n = 0;
        while self.channel.try_receive().is_ok() {
            n += 1;
        }
        n
    }
}

/// Block the calling thread until `channel` yields a value or `timeout`
/// elapses.  The wait is reactor-driven; nothing spins.
pub fn receive_within<T, const N: usize>(
    channel: &Channel<CriticalSectionRawMutex, T, N>,
    timeout: Duration,
) -> Option<T> {
    if let Ok(v) = channel.try_receive() {
        return Some(v);
    }
    futures_lite::future::block_on(futures_lite::future::or(
        async { Some(channel.receive().await) },
        async {
            async_io_mini::Timer::after(timeout).await;
            None
        },
    ))
}

/// Producer handle held by a link's reader.
#[derive(Clone)]
pub struct NotificationSender {
    channel: Arc<LinkEventChannel>,
}

impl NotificationSender {
    /// Parse a raw notification value and queue it.
    ///
    /// Invalid payloads are logged and dropped.  Returns `true` if an event
    /// was queued.
    pub fn push_raw(&self, raw: &[u8]) -> bool {
        match NotificationPayload::parse(raw) {
            Ok(payload) => self.push(LinkEvent::Notification(payload)),
            Err(e) => {
                warn!(
                    "BLE: discarding notification {:?}: {}",
                    String::from_utf8_lossy(raw),
                    e
                );
                false
            }
        }
    }

    /// Report that the connection is gone.
    pub fn link_dropped(&self) -> bool {
        self.push(LinkEvent::Dropped)
    }

    fn push(&self, event: LinkEvent) -> bool {
        if self.channel.try_send(event).is_err() {
            warn!("BLE: link event channel full, dropping {:?}", event);
            return false;
        }
        true
    }
}
