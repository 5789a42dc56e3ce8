//! HomeGuard main Entry Point
//!
//! Three supervised task threads around one shared state value.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GattToolCentral   SysfsMotionPin   HttpTranscriber            │
//! │  (BleCentral)      (InputPin)       (Transcriber)              │
//! │  UrlAudioPlayer    RpicamRecorder   TwilioNotifier             │
//! │  (AudioPlayer)     (VideoRecorder)  (Notifier)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │   ble-link ─┐                                                  │
//! │   motion  ──┼──▶ SharedSystemState ◀── AlertDispatcher         │
//! │   voice   ──┘                                                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The process runs until SIGINT/SIGTERM.  On the way out `main` returns
//! normally, so the GPIO export guard drops and releases the line.
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use homeguard::adapters::audio::UrlAudioPlayer;
use homeguard::adapters::ble::GattToolCentral;
use homeguard::adapters::camera::RpicamRecorder;
use homeguard::adapters::gpio::GpioLineGuard;
use homeguard::adapters::log_sink::LogEventSink;
use homeguard::adapters::speech::HttpTranscriber;
use homeguard::adapters::time::{MonotonicClock, StdDelay};
use homeguard::adapters::twilio::TwilioNotifier;
use homeguard::alert::AlertDispatcher;
use homeguard::app::events::AppEvent;
use homeguard::app::ports::EventSink;
use homeguard::config::SystemConfig;
use homeguard::link::BleLinkSupervisor;
use homeguard::motion::MotionMonitor;
use homeguard::pins::MOTION_SENSOR_GPIO;
use homeguard::state::SharedSystemState;
use homeguard::tasks::spawn_supervised;
use homeguard::voice::VoiceTask;

/// Env var naming an optional JSON config file.
const CONFIG_ENV: &str = "HOMEGUARD_CONFIG";

const BLE_STACK_KB: usize = 64;
const MOTION_STACK_KB: usize = 64;
const VOICE_STACK_KB: usize = 128;

fn load_config() -> Result<SystemConfig> {
    let mut config = match std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
        Some(path) => match SystemConfig::load(&path) {
            Ok(cfg) => {
                info!("Config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Config load from {} failed ({}), using defaults", path.display(), e);
                SystemConfig::default()
            }
        },
        None => SystemConfig::default(),
    };
    config.apply_env_secrets();
    config.validate().context("invalid configuration")?;
    if config.twilio.account_sid.is_empty() {
        warn!("Twilio credentials not set; SMS and call alerts will fail");
    }
    Ok(config)
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  HomeGuard v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;

    // ── 3. Shutdown signal ────────────────────────────────────
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("failed to install signal handler")?;

    // ── 4. Motion line (released when `gpio` drops) ───────────
    let gpio = GpioLineGuard::export_input(&config.devices.gpio_root, MOTION_SENSOR_GPIO)
        .context("motion sensor setup failed")?;

    // ── 5. Shared state + alert pipeline ──────────────────────
    let state = SharedSystemState::new();
    let dispatcher = Arc::new(AlertDispatcher::new(
        state.clone(),
        UrlAudioPlayer::new(config.devices.audio_player.clone()),
        RpicamRecorder::new(
            config.devices.camera.clone(),
            config.devices.ffmpeg.clone(),
            &config.devices.video_dir,
        ),
        TwilioNotifier::new(config.twilio.clone()),
        config.alert.clone(),
    ));

    // ── 6. Tasks ──────────────────────────────────────────────
    let supervisor = BleLinkSupervisor::new(
        GattToolCentral::new(
            config.devices.gatttool.clone(),
            Duration::from_millis(u64::from(config.timing.link_request_timeout_ms)),
        ),
        Arc::clone(&dispatcher),
        StdDelay,
        LogEventSink::new(),
        state.clone(),
        config.ble.clone(),
        config.timing.clone(),
    );
    spawn_supervised("ble-link", BLE_STACK_KB, supervisor).context("spawn ble-link")?;

    let monitor = MotionMonitor::new(
        gpio.pin(),
        MonotonicClock::new(),
        StdDelay,
        Arc::clone(&dispatcher),
        LogEventSink::new(),
        state.clone(),
        &config.motion,
    );
    spawn_supervised("motion", MOTION_STACK_KB, monitor).context("spawn motion")?;

    let voice = VoiceTask::new(
        HttpTranscriber::new(config.devices.recorder.clone(), config.speech.clone()),
        UrlAudioPlayer::new(config.devices.audio_player.clone()),
        StdDelay,
        LogEventSink::new(),
        state.clone(),
        config.voice.clone(),
        &config.timing,
    );
    spawn_supervised("voice", VOICE_STACK_KB, voice).context("spawn voice")?;

    let mut sink = LogEventSink::new();
    for task in ["ble-link", "motion", "voice"] {
        sink.emit(&AppEvent::Started { task });
    }
    info!("System running; armed={}", state.armed());

    // ── 7. Wait for SIGINT/SIGTERM ────────────────────────────
    // Task threads never return; a closed channel is treated like a signal.
    let _ = stop_rx.recv();
    info!("Interrupt received, shutting down");
    drop(gpio);
    Ok(())
}
