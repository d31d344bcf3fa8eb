//! Hardware-facing drivers: input filtering, relay, indicators, badge framing.

pub mod badge;
pub mod debounce;
pub mod led;
pub mod relay;
pub mod watchdog;
