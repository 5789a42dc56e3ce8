//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements               | Connects to                   |
//! |------------|--------------------------|-------------------------------|
//! | `audio`    | AudioPlayer              | HTTP fetch + `ffplay`         |
//! | `ble`      | BleCentral / BleLink     | `gatttool -I` helper process  |
//! | `camera`   | VideoRecorder            | `rpicam-vid` + `ffmpeg` remux |
//! | `gpio`     | InputPin (embedded-hal)  | Linux sysfs GPIO              |
//! | `log_sink` | EventSink                | `log` facade                  |
//! | `speech`   | Transcriber              | `arecord` + HTTP STT endpoint |
//! | `time`     | TimePort / DelayNs       | `std::time`, `thread::sleep`  |
//! | `twilio`   | Notifier                 | Twilio REST API               |

pub mod audio;
pub mod ble;
pub mod camera;
pub mod gpio;
pub mod log_sink;
pub mod speech;
pub mod time;
pub mod twilio;
pub(super) mod utils;
