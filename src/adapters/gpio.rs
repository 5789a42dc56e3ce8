//! Linux sysfs GPIO adapter for the PIR motion line.
//!
//! [`GpioLineGuard`] exports the line and sets it as an input; dropping the
//! guard unexports it again, so the reservation is released on every exit
//! path of the scope that owns it.  [`SysfsMotionPin`] reads the line's
//! `value` file and implements embedded-hal [`InputPin`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use embedded_hal::digital::{ErrorType, InputPin};
use log::{debug, info, warn};

use crate::error::{Result, SensorError};

/// udev needs a moment to fix permissions on a freshly exported line.
const EXPORT_SETTLE_RETRIES: u32 = 20;
const EXPORT_SETTLE_STEP: Duration = Duration::from_millis(50);

/// Owns the sysfs export of one GPIO line.
#[derive(Debug)]
pub struct GpioLineGuard {
    root: PathBuf,
    line: u32,
    exported_by_us: bool,
}

impl GpioLineGuard {
    /// Export `line` under `root` (usually `/sys/class/gpio`) as an input.
    pub fn export_input(root: &Path, line: u32) -> Result<Self> {
        let line_dir = root.join(format!("gpio{line}"));
        let exported_by_us = if line_dir.exists() {
            debug!("GPIO: line {} already exported", line);
            false
        } else {
            fs::write(root.join("export"), line.to_string())
                .map_err(|e| SensorError::SetupFailed(format!("export {line}: {e}")))?;
            true
        };

        let guard = Self {
            root: root.to_path_buf(),
            line,
            exported_by_us,
        };

        let direction = line_dir.join("direction");
        let mut last_err = None;
        for _ in 0..EXPORT_SETTLE_RETRIES {
            match fs::write(&direction, "in") {
                Ok(()) => {
                    info!("GPIO: line {} ready as input", line);
                    return Ok(guard);
                }
                Err(e) => {
                    last_err = Some(e);
                    std::thread::sleep(EXPORT_SETTLE_STEP);
                }
            }
        }
        Err(SensorError::SetupFailed(format!(
            "direction for line {line}: {}",
            last_err.map_or_else(|| "unknown".into(), |e| e.to_string())
        ))
        .into())
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// A reader for the exported line.  The guard must outlive it.
    pub fn pin(&self) -> SysfsMotionPin {
        SysfsMotionPin {
            value_path: self.root.join(format!("gpio{}", self.line)).join("value"),
        }
    }
}

impl Drop for GpioLineGuard {
    fn drop(&mut self) {
        if !self.exported_by_us {
            return;
        }
        match fs::write(self.root.join("unexport"), self.line.to_string()) {
            Ok(()) => info!("GPIO: line {} released", self.line),
            Err(e) => warn!("GPIO: failed to release line {}: {}", self.line, e),
        }
    }
}

/// Active-high motion input read through sysfs.
#[derive(Debug, Clone)]
pub struct SysfsMotionPin {
    value_path: PathBuf,
}

impl ErrorType for SysfsMotionPin {
    type Error = SensorError;
}

impl InputPin for SysfsMotionPin {
    fn is_high(&mut self) -> core::result::Result<bool, Self::Error> {
        let raw = fs::read_to_string(&self.value_path)
            .map_err(|e| SensorError::ReadFailed(e.to_string()))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(SensorError::BadLevel),
        }
    }

    fn is_low(&mut self) -> core::result::Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
