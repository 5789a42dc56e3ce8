//! Fuzz target: `NotificationPayload::parse`
//!
//! Feeds arbitrary notification values and checks that anything accepted
//! re-renders to a canonical `"a,b"` pair that parses to the same value.
//!
//! cargo fuzz run fuzz_notification_payload

#![no_main]

use homeguard::link::payload::NotificationPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = NotificationPayload::parse(data) {
        let canonical = payload.to_string();
        assert_eq!(canonical.len(), 3, "canonical form is two digits and a comma");
        assert_eq!(NotificationPayload::parse(canonical.as_bytes()), Ok(payload));
    }
});
