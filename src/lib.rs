//! Authbox firmware library.
//!
//! Exposes the pure-logic modules for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(feature = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod net;
pub mod pins;

// Host tests need a critical-section implementation for the telemetry channel.
#[cfg(test)]
use critical_section as _;
