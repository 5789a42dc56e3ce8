//! Fuzz target: `parse_gatt_line`
//!
//! gatttool output is untrusted text from a child process.  Every line must
//! classify without panicking, and notification values must never be longer
//! than the line has room for.
//!
//! cargo fuzz run fuzz_gatt_line

#![no_main]

use homeguard::adapters::ble::{GattLine, parse_gatt_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if let GattLine::Notification { value, .. } = parse_gatt_line(&line) {
        assert!(value.len() <= line.len() / 2, "decoded more bytes than the line holds");
    }
});
