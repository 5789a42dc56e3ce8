//! HomeGuard security coordinator library.
//!
//! Exposes the coordinator's state, task loops and adapters so the binary
//! and the integration tests build on the same code.  Everything outside
//! [`adapters`] is free of device, process and network I/O.

#![deny(unused_must_use)]

pub mod adapters;
pub mod alert;
pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod motion;
pub mod pins;
pub mod state;
pub mod tasks;
pub mod voice;
