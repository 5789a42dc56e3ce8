//! Alert dispatch pipeline.
//!
//! ```text
//!  try_begin_alert ──▶ ┌ audio warning ┐ ──▶ SMS ──▶ call ──▶ complete
//!   (or Skipped)       └ video capture ┘
//!                        scoped fork/join
//! ```
//!
//! At most one dispatch runs at a time; the in-flight slot is the
//! [`AlertGuard`](crate::state::AlertGuard) returned by
//! [`SharedSystemState::try_begin_alert`].  Every channel is isolated: an
//! error or a panic in one is recorded in the [`DispatchReport`] and the
//! remaining channels still run.

use core::time::Duration;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::thread;

use log::{error, info, warn};

use crate::app::events::BreakInSource;
use crate::app::ports::{AudioPlayer, BreakInHandler, Notifier, VideoRecorder};
use crate::config::AlertConfig;
use crate::error::CollaboratorError;
use crate::state::SharedSystemState;
use crate::tasks::panic_message;

/// Per-channel outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub source: BreakInSource,
    pub audio_played: bool,
    /// Path of the finished recording.
    pub video: Option<PathBuf>,
    pub sms_sid: Option<String>,
    pub call_sid: Option<String>,
    /// One `"<channel>: <reason>"` entry per failed channel.
    pub failures: Vec<String>,
}

impl DispatchReport {
    fn new(source: BreakInSource) -> Self {
        Self {
            source,
            audio_played: false,
            video: None,
            sms_sid: None,
            call_sid: None,
            failures: Vec::new(),
        }
    }

    /// Every channel succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, channel: &str, why: impl core::fmt::Display) {
        warn!("ALERT: {} failed: {}", channel, why);
        self.failures.push(format!("{channel}: {why}"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(DispatchReport),
    /// Another dispatch was already in flight; nothing ran.
    Skipped,
}

pub struct AlertDispatcher<A, V, N> {
    state: SharedSystemState,
    player: A,
    recorder: V,
    notifier: N,
    config: AlertConfig,
}

impl<A, V, N> AlertDispatcher<A, V, N>
where
    A: AudioPlayer,
    V: VideoRecorder,
    N: Notifier,
{
    pub fn new(
        state: SharedSystemState,
        player: A,
        recorder: V,
        notifier: N,
        config: AlertConfig,
    ) -> Self {
        Self {
            state,
            player,
            recorder,
            notifier,
            config,
        }
    }

    /// Run one dispatch, or return [`DispatchOutcome::Skipped`] if one is
    /// already running.  Blocks until every channel has finished.
    pub fn dispatch(&self, source: BreakInSource) -> DispatchOutcome {
        let Some(guard) = self.state.try_begin_alert() else {
            info!("ALERT: dispatch in flight, ignoring {} trigger", source);
            return DispatchOutcome::Skipped;
        };
        info!("ALERT: potential break-in ({}), dispatching", source);

        let mut report = DispatchReport::new(source);
        self.warn_and_record(&mut report);
        self.notify(&mut report);

        guard.complete();
        if report.is_clean() {
            info!("ALERT: dispatch complete");
        } else {
            warn!(
                "ALERT: dispatch complete with {} failed channel(s)",
                report.failures.len()
            );
        }
        DispatchOutcome::Completed(report)
    }

    /// Audio warning and video capture, concurrently.
    fn warn_and_record(&self, report: &mut DispatchReport) {
        let duration = Duration::from_secs(u64::from(self.config.video_duration_secs));
        let url = self.config.warning_audio_url.as_str();

        thread::scope(|s| {
            let audio = thread::Builder::new()
                .name("alert-audio".into())
                .spawn_scoped(s, || self.player.play_url(url));
            let video = thread::Builder::new()
                .name("alert-video".into())
                .spawn_scoped(s, || self.recorder.record(duration));

            match audio.map(|h| h.join()) {
                Ok(Ok(Ok(()))) => {
                    info!("ALERT: warning played");
                    report.audio_played = true;
                }
                Ok(Ok(Err(e))) => report.fail("audio", e),
                Ok(Err(p)) => report.fail("audio", panic_message(p.as_ref())),
                Err(e) => report.fail("audio", e),
            }
            match video.map(|h| h.join()) {
                Ok(Ok(Ok(path))) => {
                    info!("ALERT: video saved to {}", path.display());
                    report.video = Some(path);
                }
                Ok(Ok(Err(e))) => report.fail("video", e),
                Ok(Err(p)) => report.fail("video", panic_message(p.as_ref())),
                Err(e) => report.fail("video", e),
            }
        });
    }

    /// SMS then call, sequentially.
    fn notify(&self, report: &mut DispatchReport) {
        let to = self.config.notify_to.as_str();

        match guarded(|| self.notifier.send_sms(to, &self.config.sms_body)) {
            Ok(sid) => {
                info!("ALERT: SMS sent (sid={})", sid);
                report.sms_sid = Some(sid);
            }
            Err(why) => report.fail("sms", why),
        }
        match guarded(|| self.notifier.place_call(to)) {
            Ok(sid) => {
                info!("ALERT: call placed (sid={})", sid);
                report.call_sid = Some(sid);
            }
            Err(why) => report.fail("call", why),
        }
    }
}

/// Run a collaborator call, folding a panic into its error string.
fn guarded<T>(f: impl FnOnce() -> Result<T, CollaboratorError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(e.to_string()),
        Err(p) => {
            let msg = panic_message(p.as_ref());
            error!("ALERT: collaborator panicked: {}", msg);
            Err(msg)
        }
    }
}

impl<A, V, N> BreakInHandler for AlertDispatcher<A, V, N>
where
    A: AudioPlayer,
    V: VideoRecorder,
    N: Notifier,
{
    fn on_break_in(&self, source: BreakInSource) -> DispatchOutcome {
        self.dispatch(source)
    }
}
