//! Application core - access-control logic, zero direct I/O.
//!
//! All interaction with hardware and the network happens through the
//! port traits in [`ports`], keeping this layer testable on the host.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
