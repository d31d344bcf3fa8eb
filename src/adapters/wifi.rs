//! WiFi station-mode adapter.
//!
//! Credentials are baked in at build time (`AUTHBOX_WIFI_SSID`,
//! `AUTHBOX_WIFI_PASSWORD`) and validated before the radio is touched.
//!
//! ## cfg gating
//!
//! - **`espidf`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **host**: validation and the reconnect supervisor only.
//!
//! ## Reconnection policy
//!
//! On disconnect the supervisor waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) between attempts.

use core::fmt;
use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed(String),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed(e) => write!(f, "WiFi connection failed: {e}"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

const INITIAL_BACKOFF_MS: u64 = 2_000;
const MAX_BACKOFF_MS: u64 = 60_000;

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let ssid = heapless::String::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        let password =
            heapless::String::try_from(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(Self { ssid, password })
    }

    /// Credentials from the build environment; `None` SSID means unset.
    pub fn from_build(ssid: Option<&str>, password: Option<&str>) -> Result<Self, ConnectivityError> {
        let ssid = ssid.ok_or(ConnectivityError::NoCredentials)?;
        Self::new(ssid, password.unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Reconnect supervisor
// ───────────────────────────────────────────────────────────────

/// The bits of a station link the supervisor needs.
pub trait Station {
    fn is_connected(&self) -> bool;
    fn reconnect(&mut self) -> Result<(), ConnectivityError>;
}

pub struct WifiSupervisor<S: Station> {
    station: S,
    backoff_ms: u64,
    next_attempt_ms: u64,
    attempts: u32,
}

impl<S: Station> WifiSupervisor<S> {
    pub fn new(station: S) -> Self {
        Self {
            station,
            backoff_ms: INITIAL_BACKOFF_MS,
            next_attempt_ms: 0,
            attempts: 0,
        }
    }

    /// Call periodically; retries a dropped link on the backoff schedule.
    pub fn poll(&mut self, now_ms: u64) {
        if self.station.is_connected() {
            if self.attempts > 0 {
                info!("WiFi: link restored after {} attempt(s)", self.attempts);
            }
            self.attempts = 0;
            self.backoff_ms = INITIAL_BACKOFF_MS;
            self.next_attempt_ms = 0;
            return;
        }
        if now_ms < self.next_attempt_ms {
            return;
        }
        self.attempts += 1;
        match self.station.reconnect() {
            Ok(()) => info!("WiFi: reconnect issued (attempt {})", self.attempts),
            Err(e) => warn!("WiFi: reconnect failed ({e}), retry in {} ms", self.backoff_ms),
        }
        // The link-up check above resets the schedule once the AP answers.
        self.next_attempt_ms = now_ms + self.backoff_ms;
        self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
    }

    pub fn backoff_ms(&self) -> u64 {
        self.backoff_ms
    }

    pub fn station(&self) -> &S {
        &self.station
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

    pub type EspStation = BlockingWifi<EspWifi<'static>>;

    /// Bring the STA interface up and block until it has an IP.
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        creds: &WifiCredentials,
    ) -> anyhow::Result<EspStation> {
        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;

        let auth_method = if creds.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: creds
                .ssid()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: creds
                .password()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        }))?;

        info!("WiFi: connecting to '{}'", creds.ssid());
        wifi.start()?;
        wifi.connect()?;
        wifi.wait_netif_up()?;

        let ip = wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi: connected, ip={}", ip.ip);
        Ok(wifi)
    }

    impl Station for EspStation {
        fn is_connected(&self) -> bool {
            BlockingWifi::is_connected(self).unwrap_or(false)
        }

        /// Non-blocking: the control loop must keep feeding the watchdog.
        fn reconnect(&mut self) -> Result<(), ConnectivityError> {
            self.wifi_mut()
                .connect()
                .map_err(|e| ConnectivityError::ConnectionFailed(e.to_string()))
        }
    }
}

#[cfg(feature = "espidf")]
pub use esp::{EspStation, connect};
