//! Camera adapter: `rpicam-vid` capture plus `ffmpeg` MP4 remux.
//!
//! Captures raw H.264 at 1920×1080 / 10 Mbit/s into
//! `<video_dir>/<%Y%m%d_%H%M%S>.h264`, then remuxes it (no re-encode) into
//! the `.mp4` next to it.  The raw file is removed once the remux succeeds
//! and kept if it fails.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::VideoRecorder;
use crate::error::CollaboratorError;

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;
const BITRATE_BPS: u32 = 10_000_000;
const FRAMERATE: u32 = 30;

pub struct RpicamRecorder {
    camera: String,
    ffmpeg: String,
    video_dir: PathBuf,
}

impl RpicamRecorder {
    pub fn new(camera: impl Into<String>, ffmpeg: impl Into<String>, video_dir: &Path) -> Self {
        Self {
            camera: camera.into(),
            ffmpeg: ffmpeg.into(),
            video_dir: video_dir.to_path_buf(),
        }
    }

    /// `<video_dir>/<stamp>` without extension.
    fn capture_stem(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.video_dir.join(stamp.to_string())
    }

    fn capture(&self, raw: &Path, duration: Duration) -> Result<(), CollaboratorError> {
        let status = Command::new(&self.camera)
            .arg("-t")
            .arg(duration.as_millis().to_string())
            .args(["--width", &WIDTH.to_string()])
            .args(["--height", &HEIGHT.to_string()])
            .args(["--bitrate", &BITRATE_BPS.to_string()])
            .args(["--framerate", &FRAMERATE.to_string()])
            .args(["--codec", "h264", "--nopreview", "-o"])
            .arg(raw)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| CollaboratorError::Process(format!("{}: {e}", self.camera)))?;
        if !status.success() {
            return Err(CollaboratorError::Process(format!(
                "{} exited with {status}",
                self.camera
            )));
        }
        Ok(())
    }

    fn remux(&self, raw: &Path, mp4: &Path) -> Result<(), CollaboratorError> {
        let status = Command::new(&self.ffmpeg)
            .args(["-loglevel", "error", "-framerate", &FRAMERATE.to_string(), "-i"])
            .arg(raw)
            .args(["-c", "copy", "-f", "mp4", "-y"])
            .arg(mp4)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| CollaboratorError::Conversion(format!("{}: {e}", self.ffmpeg)))?;
        if !status.success() {
            return Err(CollaboratorError::Conversion(format!(
                "{} exited with {status}",
                self.ffmpeg
            )));
        }
        Ok(())
    }
}

impl VideoRecorder for RpicamRecorder {
    fn record(&self, duration: Duration) -> Result<PathBuf, CollaboratorError> {
        std::fs::create_dir_all(&self.video_dir)
            .map_err(|e| CollaboratorError::Process(format!("video dir: {e}")))?;
        let stem = self.capture_stem();
        let raw = stem.with_extension("h264");
        let mp4 = stem.with_extension("mp4");

        info!("CAMERA: recording {}s to {}", duration.as_secs(), raw.display());
        self.capture(&raw, duration)?;
        self.remux(&raw, &mp4)?;

        if let Err(e) = std::fs::remove_file(&raw) {
            warn!("CAMERA: could not remove {}: {}", raw.display(), e);
        } else {
            debug!("CAMERA: removed {}", raw.display());
        }
        Ok(mp4)
    }
}
