//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the control-loop task to the ESP-IDF TWDT.  If the loop
//! stops feeding it (wedged HTTP call, deadlock) the chip panics and
//! resets, and every GPIO output, relay included, returns to its
//! de-energized reset level.

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
    esp_task_wdt_reset,
};
use log::info;
#[cfg(feature = "espidf")]
use log::warn;

pub struct Watchdog {
    subscribed: bool,
}

impl Watchdog {
    /// Configure the TWDT with `timeout_ms` and subscribe the calling task.
    #[cfg(feature = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI calls with a valid config; a null handle means
        // "current task".
        let (reconf, add) = unsafe {
            (
                esp_task_wdt_reconfigure(&cfg),
                esp_task_wdt_add(core::ptr::null_mut()),
            )
        };
        if reconf != ESP_OK {
            warn!("Watchdog: reconfigure returned {reconf} (already configured?)");
        }
        let subscribed = add == ESP_OK;
        if subscribed {
            info!("Watchdog: subscribed ({timeout_ms} ms, panic on trigger)");
        } else {
            warn!("Watchdog: failed to subscribe ({add})");
        }
        Self { subscribed }
    }

    /// Host builds have no TWDT.
    #[cfg(not(feature = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        info!("Watchdog(sim): {timeout_ms} ms, no-op");
        Self { subscribed: false }
    }

    /// Must be called more often than the configured timeout.
    pub fn feed(&self) {
        #[cfg(feature = "espidf")]
        if self.subscribed {
            // SAFETY: task is subscribed; reset has no other preconditions.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}
