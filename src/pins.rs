//! GPIO line assignments for the HomeGuard board.
//!
//! Numbers are BCM line offsets as exposed under `/sys/class/gpio`.

// ---------------------------------------------------------------------------
// Sensors: digital
// ---------------------------------------------------------------------------

/// HC-SR501 PIR motion sensor output. HIGH = motion present.
pub const MOTION_SENSOR_GPIO: u32 = 18;
