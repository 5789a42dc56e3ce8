//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one task or pipeline
//! against mock adapters.  All tests run on the host with no BLE radio,
//! GPIO, camera or network required.

mod alert_tests;
mod link_tests;
mod motion_tests;
mod scenario_tests;
mod voice_tests;
