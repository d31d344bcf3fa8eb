//! Hardware adapter - bridges the relay and indicator LEDs to [`ActuatorPort`].
//!
//! Generic over `embedded-hal` output pins: ESP `PinDriver`s on the
//! board, recording pins in tests.  LED write failures are logged and
//! otherwise ignored; relay failures go back to the service.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::ActuatorPort;
use crate::drivers::led::{DENIAL_FLASH_MS, LedDriver, Pattern};
use crate::drivers::relay::RelayDriver;
use crate::error::RelayError;

pub struct HardwareAdapter<R: OutputPin, G: OutputPin, L: OutputPin> {
    relay: RelayDriver<R>,
    green: LedDriver<G>,
    red: LedDriver<L>,
}

impl<R: OutputPin, G: OutputPin, L: OutputPin> HardwareAdapter<R, G, L> {
    pub fn new(relay: RelayDriver<R>, green: LedDriver<G>, red: LedDriver<L>) -> Self {
        Self { relay, green, red }
    }

    pub fn relay(&self) -> &RelayDriver<R> {
        &self.relay
    }

    pub fn green(&self) -> &LedDriver<G> {
        &self.green
    }

    pub fn red(&self) -> &LedDriver<L> {
        &self.red
    }
}

impl<R: OutputPin, G: OutputPin, L: OutputPin> ActuatorPort for HardwareAdapter<R, G, L> {
    fn set_relay(&mut self, energized: bool) -> Result<(), RelayError> {
        self.relay.set(energized).map(|_| ())
    }

    fn set_leds(&mut self, green: Pattern, red: Pattern, now_ms: u64) {
        self.green.engine().set_pattern(green, now_ms);
        self.red.engine().set_pattern(red, now_ms);
    }

    fn flash_denied(&mut self, now_ms: u64) {
        self.red
            .engine()
            .overlay(Pattern::RapidFlash, now_ms, DENIAL_FLASH_MS);
    }

    fn refresh_leds(&mut self, now_ms: u64) {
        if self.green.refresh(now_ms).is_err() {
            warn!("LED: green write failed");
        }
        if self.red.refresh(now_ms).is_err() {
            warn!("LED: red write failed");
        }
    }
}
