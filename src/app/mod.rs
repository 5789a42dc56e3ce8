//! Application boundary: ports, events and commands.
//!
//! The coordinator's task loops depend only on the **port traits** defined
//! in [`ports`], so every loop is testable without a radio, a sensor or a
//! network.

pub mod commands;
pub mod events;
pub mod ports;
