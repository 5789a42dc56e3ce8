//! Voice command session and the voice task.
//!
//! ```text
//!            wake phrase
//!  Dormant ──────────────▶ Active(0)
//!     ▲                      │  command      ⇒ Active(0), set armed
//!     │                      │  unrecognised ⇒ Active(n + 1)
//!     └──── n ≥ max ─────────┘
//! ```
//!
//! The session itself is a pure state machine over [`ListenOutcome`]s.
//! [`VoiceTask`] wires it to a transcriber, an audio player for the
//! confirmation cues, and the shared state.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::commands::VoiceCommand;
use crate::app::events::{AppEvent, ArmSource};
use crate::app::ports::{AudioPlayer, EventSink, ListenOutcome, Transcriber};
use crate::config::{TimingConfig, VoiceConfig};
use crate::state::SharedSystemState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Dormant,
    Active { failed_attempts: u32 },
}

/// What the task should do after feeding one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAction {
    None,
    /// Wake phrase heard; play the wake cue.
    Woke,
    /// Execute a command and play its cue.
    Command(VoiceCommand),
    /// Unrecognised input counted; session still active.
    Unrecognised { failed_attempts: u32 },
    /// Budget exhausted; session went dormant.
    TimedOut { failed_attempts: u32 },
    /// Recognition service unavailable; nothing changed.
    ServiceError,
}

pub struct VoiceCommandSession {
    state: SessionState,
    wake_phrase: String,
    max_failed_attempts: u32,
}

impl VoiceCommandSession {
    pub fn new(wake_phrase: &str, max_failed_attempts: u32) -> Self {
        Self {
            state: SessionState::Dormant,
            wake_phrase: wake_phrase.to_lowercase(),
            max_failed_attempts,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    pub fn handle(&mut self, outcome: &ListenOutcome) -> VoiceAction {
        match (self.state, outcome) {
            (_, ListenOutcome::NoSpeech) => VoiceAction::None,
            (_, ListenOutcome::ServiceError(_)) => VoiceAction::ServiceError,

            (SessionState::Dormant, ListenOutcome::Text(text)) => {
                if text.to_lowercase().contains(&self.wake_phrase) {
                    self.state = SessionState::Active { failed_attempts: 0 };
                    VoiceAction::Woke
                } else {
                    VoiceAction::None
                }
            }
            (SessionState::Dormant, ListenOutcome::Unintelligible) => VoiceAction::None,

            (SessionState::Active { failed_attempts }, ListenOutcome::Text(text)) => {
                match VoiceCommand::from_transcript(text) {
                    Some(cmd) => {
                        self.state = SessionState::Active { failed_attempts: 0 };
                        VoiceAction::Command(cmd)
                    }
                    None => self.count_failure(failed_attempts),
                }
            }
            (SessionState::Active { failed_attempts }, ListenOutcome::Unintelligible) => {
                self.count_failure(failed_attempts)
            }
        }
    }

    fn count_failure(&mut self, failed_attempts: u32) -> VoiceAction {
        let n = failed_attempts.saturating_add(1);
        if n >= self.max_failed_attempts {
            self.state = SessionState::Dormant;
            VoiceAction::TimedOut { failed_attempts: n }
        } else {
            self.state = SessionState::Active { failed_attempts: n };
            VoiceAction::Unrecognised { failed_attempts: n }
        }
    }
}

/// Voice task: owns the microphone via its [`Transcriber`].
pub struct VoiceTask<T, A, D, S> {
    transcriber: T,
    player: A,
    delay: D,
    sink: S,
    state: SharedSystemState,
    session: VoiceCommandSession,
    voice: VoiceConfig,
    cue_delay_ms: u32,
    calibrated: bool,
}

impl<T, A, D, S> VoiceTask<T, A, D, S>
where
    T: Transcriber,
    A: AudioPlayer,
    D: DelayNs,
    S: EventSink,
{
    pub fn new(
        transcriber: T,
        player: A,
        delay: D,
        sink: S,
        state: SharedSystemState,
        voice: VoiceConfig,
        timing: &TimingConfig,
    ) -> Self {
        let session = VoiceCommandSession::new(&voice.wake_phrase, voice.max_failed_attempts);
        Self {
            transcriber,
            player,
            delay,
            sink,
            state,
            session,
            voice,
            cue_delay_ms: timing.cue_delay_ms,
            calibrated: false,
        }
    }

    pub fn session(&self) -> &VoiceCommandSession {
        &self.session
    }

    /// One listen chunk.  Calibrates the listener on the first call.
    pub fn step(&mut self) -> VoiceAction {
        if !self.calibrated {
            self.calibrated = true;
            match self.transcriber.calibrate() {
                Ok(()) => info!("VOICE: calibrated for ambient noise"),
                Err(e) => warn!("VOICE: ambient calibration failed: {}", e),
            }
            info!("VOICE: listening for '{}'", self.voice.wake_phrase);
        }

        let outcome = self.transcriber.listen(
            Duration::from_millis(u64::from(self.voice.listen_timeout_ms)),
            Duration::from_millis(u64::from(self.voice.phrase_limit_ms)),
        );
        if let ListenOutcome::Text(text) = &outcome {
            info!("VOICE: heard '{}'", text);
        }

        let action = self.session.handle(&outcome);
        match action {
            VoiceAction::Woke => {
                info!("VOICE: wake phrase detected, session active");
                self.sink.emit(&AppEvent::VoiceWoke);
                let url = self.voice.wake_cue_url.clone();
                self.play_cue(&url);
            }
            VoiceAction::Command(cmd) => {
                let armed = cmd.armed();
                self.state.set_armed(armed);
                info!(
                    "VOICE: {}",
                    if armed { "system locked" } else { "system deactivated" }
                );
                self.sink.emit(&AppEvent::VoiceCommand(cmd));
                self.sink.emit(&AppEvent::ArmedChanged {
                    armed,
                    source: ArmSource::Voice,
                });
                let url = match cmd {
                    VoiceCommand::Lock => self.voice.lock_cue_url.clone(),
                    VoiceCommand::Deactivate => self.voice.deactivate_cue_url.clone(),
                };
                self.play_cue(&url);
            }
            VoiceAction::Unrecognised { failed_attempts } => {
                info!(
                    "VOICE: not understood ({}/{})",
                    failed_attempts, self.voice.max_failed_attempts
                );
            }
            VoiceAction::TimedOut { failed_attempts } => {
                info!(
                    "VOICE: deactivated after {} unrecognised attempts",
                    failed_attempts
                );
                self.sink.emit(&AppEvent::VoiceTimedOut { failed_attempts });
            }
            VoiceAction::ServiceError => {
                if let ListenOutcome::ServiceError(why) = &outcome {
                    warn!("VOICE: recognition service error: {}", why);
                }
            }
            VoiceAction::None => {}
        }
        action
    }

    fn play_cue(&mut self, url: &str) {
        self.delay.delay_ms(self.cue_delay_ms);
        if let Err(e) = self.player.play_url(url) {
            warn!("VOICE: confirmation cue failed: {}", e);
        }
    }
}
