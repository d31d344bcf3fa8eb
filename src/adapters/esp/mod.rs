//! ESP-IDF implementations of the network and I/O seams.
//!
//! Only built with the `espidf` feature; host tests use the doubles in
//! `tests/integration/mock_hw.rs` instead.

pub mod badge_uart;
pub mod gpio;
pub mod http;
pub mod mqtt;
