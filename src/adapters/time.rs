//! Time sources.
//!
//! - **`espidf`**: the ESP-IDF high-resolution timer (µs, monotonic).
//! - **host**: `std::time::Instant`, for tests and simulation.
//!
//! Wall-clock time is only used for telemetry timestamps; it reads 1970
//! until SNTP has synced.

use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic milliseconds since boot.
pub struct MonotonicClock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    #[cfg(feature = "espidf")]
    pub fn now_ms(&self) -> u64 {
        // SAFETY: no preconditions; returns µs since boot.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(feature = "espidf"))]
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Process-wide monotonic milliseconds, for threads that cannot share a clock.
pub fn uptime_ms() -> u64 {
    #[cfg(feature = "espidf")]
    {
        MonotonicClock::new().now_ms()
    }
    #[cfg(not(feature = "espidf"))]
    {
        use std::sync::OnceLock;
        static START: OnceLock<std::time::Instant> = OnceLock::new();
        START.get_or_init(std::time::Instant::now).elapsed().as_millis() as u64
    }
}

/// Unix milliseconds, or 0 if the clock is before the epoch.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
