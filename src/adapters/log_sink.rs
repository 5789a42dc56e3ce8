//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`AppEvent`] as one tagged log
//! line.  The tags (`STATE`, `LINK`, `MOTION`, `VOICE`, `ALERT`) make the
//! journal easy to grep.

use log::{info, warn};

use crate::app::events::{AppEvent, ArmSource};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { task } => {
                info!("START | task={}", task);
            }
            AppEvent::ArmedChanged { armed, source } => {
                let by = match source {
                    ArmSource::Peer => "peer",
                    ArmSource::Voice => "voice",
                };
                info!(
                    "STATE | {} by {}",
                    if *armed { "armed" } else { "disarmed" },
                    by
                );
            }
            AppEvent::LinkUp => {
                info!("LINK | up");
            }
            AppEvent::LinkDown { reason } => {
                warn!("LINK | down: {}", reason);
            }
            AppEvent::NotificationApplied(p) => {
                info!(
                    "LINK | rx activated={} break_in={}",
                    u8::from(p.system_activated),
                    u8::from(p.potential_break_in)
                );
            }
            AppEvent::StatusPushed(report) => {
                info!("LINK | tx status={}", report);
            }
            AppEvent::MotionEdge { present } => {
                info!("MOTION | {}", if *present { "present" } else { "clear" });
            }
            AppEvent::BreakIn(source) => {
                warn!("ALERT | break-in source={}", source);
            }
            AppEvent::AlertFinished(report) => {
                info!(
                    "ALERT | done source={} audio={} video={} sms={} call={} failures={}",
                    report.source,
                    report.audio_played,
                    report
                        .video
                        .as_ref()
                        .map_or_else(|| "-".into(), |p| p.display().to_string()),
                    report.sms_sid.as_deref().unwrap_or("-"),
                    report.call_sid.as_deref().unwrap_or("-"),
                    report.failures.len(),
                );
            }
            AppEvent::AlertSkipped(source) => {
                info!("ALERT | skipped source={} (in flight)", source);
            }
            AppEvent::VoiceWoke => {
                info!("VOICE | active");
            }
            AppEvent::VoiceCommand(cmd) => {
                info!("VOICE | command={:?}", cmd);
            }
            AppEvent::VoiceTimedOut { failed_attempts } => {
                info!("VOICE | dormant after {} failed attempts", failed_attempts);
            }
        }
    }
}
