//! Relay driver.
//!
//! The only code that writes the tool's power relay.  Polarity lives
//! here and nowhere else: callers say `set(true)` for "tool energized".
//! Repeated commands for the state already on the pin skip the GPIO
//! write.

use embedded_hal::digital::{OutputPin, PinState};
use log::{error, info};

use crate::error::RelayError;

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    active_low: bool,
    /// Last level successfully written; `None` until the first write.
    energized: Option<bool>,
    writes: u32,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take ownership of the pin and drive it de-energized immediately.
    pub fn new(pin: P, active_low: bool) -> Result<Self, RelayError> {
        let mut relay = Self {
            pin,
            active_low,
            energized: None,
            writes: 0,
        };
        relay.set(false)?;
        Ok(relay)
    }

    /// Command the relay.  Returns `true` if the pin was actually written.
    pub fn set(&mut self, energized: bool) -> Result<bool, RelayError> {
        if self.energized == Some(energized) {
            return Ok(false);
        }

        let level = PinState::from(energized != self.active_low);
        if self.pin.set_state(level).is_err() {
            error!("RELAY: GPIO write failed (energized={energized})");
            // Unknown electrical state: force the next call to rewrite.
            self.energized = None;
            return Err(RelayError::GpioWriteFailed);
        }

        self.energized = Some(energized);
        self.writes = self.writes.wrapping_add(1);
        info!("RELAY: {}", if energized { "ON" } else { "OFF" });
        Ok(true)
    }

    pub fn is_energized(&self) -> bool {
        self.energized == Some(true)
    }

    /// Physical writes performed since construction.
    pub fn write_count(&self) -> u32 {
        self.writes
    }
}
