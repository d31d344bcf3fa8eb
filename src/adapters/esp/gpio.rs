//! GPIO construction from config pin numbers.

use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};

use crate::config::SignalConfig;

pub type OutputDriver = PinDriver<'static, AnyOutputPin, Output>;
pub type InputDriver = PinDriver<'static, AnyIOPin, Input>;

pub fn output(pin: u32) -> anyhow::Result<OutputDriver> {
    // SAFETY: pin numbers are unique across the config and checked
    // against the board's reserved pins before any driver is built.
    let pin = unsafe { AnyOutputPin::new(pin as i32) };
    Ok(PinDriver::output(pin)?)
}

/// Input with the pull resistor that idles the line inactive.
pub fn input(signal: &SignalConfig) -> anyhow::Result<InputDriver> {
    // SAFETY: as in `output`.
    let pin = unsafe { AnyIOPin::new(signal.pin as i32) };
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(if signal.active_low { Pull::Up } else { Pull::Down })?;
    Ok(driver)
}
