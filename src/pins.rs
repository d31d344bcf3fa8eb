//! Board wiring that is not part of the fetched tool config.
//!
//! Tool-specific pins (relay, current sense, LEDs, trigger) come from
//! the control server; this module holds the fixed wiring of the
//! Authbox main board (ESP32-S3) and the loop timing constants.

use crate::config::ToolConfig;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Badge reader (serial, 8N1)
// ---------------------------------------------------------------------------

pub const BADGE_UART_TX_GPIO: u32 = 17;
pub const BADGE_UART_RX_GPIO: u32 = 18;
pub const BADGE_UART_BAUD: u32 = 9_600;

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

pub const CONSOLE_TX_GPIO: u32 = 43;
pub const CONSOLE_RX_GPIO: u32 = 44;

/// Highest GPIO number on the ESP32-S3.
pub const MAX_GPIO: u32 = 48;

const RESERVED_GPIOS: [u32; 4] = [
    BADGE_UART_TX_GPIO,
    BADGE_UART_RX_GPIO,
    CONSOLE_TX_GPIO,
    CONSOLE_RX_GPIO,
];

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Control loop period.  Bounds input latency and LED blink resolution.
pub const CONTROL_LOOP_POLL_MS: u64 = 10;
/// How often an idle tool re-fetches its config.
pub const CONFIG_REFRESH_MS: u64 = 15 * 60 * 1_000;
/// Task watchdog timeout for the control loop.
pub const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

/// Reject configs that claim a pin the board already uses.
pub fn check_board_pins(config: &ToolConfig) -> Result<(), ConfigError> {
    for pin in config.pins() {
        if pin > MAX_GPIO || RESERVED_GPIOS.contains(&pin) {
            return Err(ConfigError::ReservedPin(pin));
        }
    }
    Ok(())
}
