//! Serial badge reader on a UART.
//!
//! Reads are non-blocking; bytes go straight into the
//! [`BadgeReader`](crate::drivers::badge::BadgeReader) framer.

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{Uart, UartDriver, config::Config};
use esp_idf_svc::hal::units::Hertz;

pub struct BadgeUart {
    uart: UartDriver<'static>,
    buf: [u8; 64],
}

impl BadgeUart {
    pub fn new<U: Uart>(
        uart: impl Peripheral<P = U> + 'static,
        tx: AnyIOPin,
        rx: AnyIOPin,
        baud: u32,
    ) -> anyhow::Result<Self> {
        let config = Config::new().baudrate(Hertz(baud));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        Ok(Self { uart, buf: [0; 64] })
    }

    /// Whatever has arrived since the last call; empty when idle or on error.
    pub fn read_available(&mut self) -> &[u8] {
        let n = self.uart.read(&mut self.buf, NON_BLOCK).unwrap_or(0);
        &self.buf[..n]
    }

    /// Throw away anything queued, e.g. scans made during a blocking call.
    pub fn drain(&mut self) {
        while !self.read_available().is_empty() {}
    }
}
