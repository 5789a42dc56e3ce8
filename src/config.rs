//! System configuration parameters
//!
//! All tunable parameters for the HomeGuard coordinator.  Defaults carry
//! the values the deployed board runs with; the binary's setup code may
//! overlay a JSON file and secrets from the environment (see `main.rs`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub ble: BleConfig,
    pub timing: TimingConfig,
    pub motion: MotionConfig,
    pub voice: VoiceConfig,
    pub alert: AlertConfig,
    pub twilio: TwilioConfig,
    pub speech: SpeechConfig,
    pub devices: DeviceConfig,
}

/// The one BLE peripheral the coordinator talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Hardware address of the peer.
    pub peer_address: String,
    /// Primary service exposing the two characteristics.
    pub service_uuid: String,
    /// Characteristic we write status strings to ("rx" from the peer's view).
    pub write_char_uuid: String,
    /// Characteristic the peer notifies on ("tx" from the peer's view).
    pub notify_char_uuid: String,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            peer_address: "d4:d4:da:4f:34:e6".into(),
            service_uuid: "6E400001-B5A3-F393-E0A9-E50E24DCCA9E".into(),
            write_char_uuid: "6E400002-B5A3-F393-E0A9-E50E24DCCA9E".into(),
            notify_char_uuid: "6E400003-B5A3-F393-E0A9-E50E24DCCA9E".into(),
        }
    }
}

/// Intervals and timeouts, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait between failed connection attempts.
    pub reconnect_backoff_ms: u32,
    /// Bounded wait for an inbound notification.
    pub notification_wait_ms: u32,
    /// Sleep after each status push.
    pub status_interval_ms: u32,
    /// Timeout for a single request/response exchange with the link helper.
    pub link_request_timeout_ms: u32,
    /// Pause before playing a voice confirmation cue.
    pub cue_delay_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_ms: 1000,
            notification_wait_ms: 1000,
            status_interval_ms: 2000,
            link_request_timeout_ms: 10_000,
            cue_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Sensor poll cadence.
    pub poll_interval_ms: u32,
    /// Motion must be continuously present for longer than this to fire.
    pub sustain_threshold_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            sustain_threshold_ms: 6000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub wake_phrase: String,
    /// Unrecognised utterances tolerated before the session goes dormant.
    pub max_failed_attempts: u32,
    /// Wait for speech to start before giving up on a chunk.
    pub listen_timeout_ms: u32,
    /// Longest phrase captured in one chunk.
    pub phrase_limit_ms: u32,
    pub wake_cue_url: String,
    pub lock_cue_url: String,
    pub deactivate_cue_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wake_phrase: "hey jarvis".into(),
            max_failed_attempts: 10,
            listen_timeout_ms: 1000,
            phrase_limit_ms: 5000,
            wake_cue_url: "https://github.com/Kenneth0120/Task7.2DAudioProcessing/blob/main/Voice/Hi_I_am_Jarvis.m4a?raw=true".into(),
            lock_cue_url: "https://github.com/Kenneth0120/Task11.2HDProject/blob/main/voice/Locking_System.m4a?raw=true".into(),
            deactivate_cue_url: "https://github.com/Kenneth0120/Task11.2HDProject/blob/main/voice/Sys_Deactivating.m4a?raw=true".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub warning_audio_url: String,
    pub video_duration_secs: u32,
    /// Phone number that receives the SMS and the call.
    pub notify_to: String,
    pub sms_body: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_audio_url: "https://github.com/Kenneth0120/Task11.2HDProject/blob/main/voice/Warning.m4a?raw=true".into(),
            video_duration_secs: 10,
            notify_to: "+610423426651".into(),
            sms_body: "Warning! Your home may have a potential break-in. In case of emergency, please call 000. ".into(),
        }
    }
}

/// Twilio account used for SMS and voice calls.  Secrets are empty by
/// default and are expected from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// TwiML document the call plays.
    pub twiml_url: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twilio.com/2010-04-01".into(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: "+17602308857".into(),
            twiml_url: "https://handler.twilio.com/twiml/EH05497edd6c164e1988aece1c424f9348".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// HTTP endpoint accepting a WAV body and answering `{"text": "..."}`.
    pub endpoint: String,
    pub sample_rate: u32,
    /// RMS floor below which a chunk counts as silence.
    pub silence_rms: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/inference".into(),
            sample_rate: 16_000,
            silence_rms: 150.0,
        }
    }
}

/// External programs and paths the adapters drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub gpio_root: PathBuf,
    pub gatttool: String,
    pub camera: String,
    pub ffmpeg: String,
    pub audio_player: String,
    pub recorder: String,
    pub video_dir: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            gatttool: "gatttool".into(),
            camera: "rpicam-vid".into(),
            ffmpeg: "ffmpeg".into(),
            audio_player: "ffplay".into(),
            recorder: "arecord".into(),
            video_dir: PathBuf::from("/var/lib/homeguard/video"),
        }
    }
}

impl SystemConfig {
    /// Load a JSON config file.  Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Overlay Twilio credentials from `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN`.
    pub fn apply_env_secrets(&mut self) {
        if let Ok(sid) = std::env::var("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = sid;
        }
        if let Ok(token) = std::env::var("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = token;
        }
    }

    /// Reject values that would stall a task or make a state machine inert.
    pub fn validate(&self) -> Result<()> {
        if !is_ble_address(&self.ble.peer_address) {
            return Err(Error::Config("ble.peer_address must be six hex octets"));
        }
        let t = &self.timing;
        if t.reconnect_backoff_ms == 0 || t.notification_wait_ms == 0 || t.link_request_timeout_ms == 0 {
            return Err(Error::Config("link timings must be non-zero"));
        }
        if self.motion.poll_interval_ms == 0 {
            return Err(Error::Config("motion.poll_interval_ms must be non-zero"));
        }
        if self.motion.sustain_threshold_ms < self.motion.poll_interval_ms {
            return Err(Error::Config("motion.sustain_threshold_ms shorter than one poll"));
        }
        if self.voice.wake_phrase.trim().is_empty() {
            return Err(Error::Config("voice.wake_phrase is empty"));
        }
        if self.voice.max_failed_attempts == 0 {
            return Err(Error::Config("voice.max_failed_attempts must be at least 1"));
        }
        if self.voice.listen_timeout_ms == 0 || self.voice.phrase_limit_ms < self.voice.listen_timeout_ms {
            return Err(Error::Config("voice listen window is inconsistent"));
        }
        if self.alert.video_duration_secs == 0 {
            return Err(Error::Config("alert.video_duration_secs must be non-zero"));
        }
        Ok(())
    }
}

fn is_ble_address(addr: &str) -> bool {
    let octets: Vec<&str> = addr.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()))
}
