//! Port traits - the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AccessService (domain)
//! ```
//!
//! Driven adapters (relay + LEDs, HTTP, MQTT, event sinks) implement these
//! traits.  [`AccessService`](super::service::AccessService) consumes them
//! via generics, so the domain core never touches hardware or sockets.

use std::time::Duration;

use crate::drivers::led::Pattern;
use crate::error::{AuthError, HttpError, RelayError, TelemetryError};
use crate::fsm::context::AuthAction;

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait ActuatorPort {
    /// Command the tool relay.  An error here is fatal.
    fn set_relay(&mut self, energized: bool) -> Result<(), RelayError>;

    /// Set the base pattern of both indicator LEDs.
    fn set_leds(&mut self, green: Pattern, red: Pattern, now_ms: u64);

    /// Overlay the denial flash on the red LED.
    fn flash_denied(&mut self, now_ms: u64);

    /// Push pattern levels to the pins.  Called every loop iteration.
    fn refresh_leds(&mut self, now_ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Authorization port (domain → control service)
// ───────────────────────────────────────────────────────────────

/// A successful authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    pub duration_minutes: u32,
}

pub trait AuthPort {
    /// One bounded authorization round trip (retries included).
    fn authorize(
        &mut self,
        badge: &str,
        action: AuthAction,
        duration_minutes: u32,
    ) -> Result<Authorization, AuthError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan one event out to two sinks (log + telemetry).
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

/// An absent sink (e.g. telemetry without a broker) swallows events.
impl<S: EventSink> EventSink for Option<S> {
    fn emit(&mut self, event: &super::events::AppEvent) {
        if let Some(sink) = self {
            sink.emit(event);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// HTTP transport (net clients → ESP HTTP client / test double)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP.  Any status code is an `Ok`; `Err` is reserved for
/// requests that never produced a response.
pub trait HttpTransport {
    fn get(&mut self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;
    fn post(&mut self, url: &str, body: &[u8], timeout: Duration)
    -> Result<HttpResponse, HttpError>;
}

// ───────────────────────────────────────────────────────────────
// MQTT port (telemetry worker → broker)
// ───────────────────────────────────────────────────────────────

pub trait MqttPort {
    /// Establish (or re-establish) the broker session.  The adapter
    /// registers the availability last-will itself.
    fn connect(&mut self) -> Result<(), TelemetryError>;
    fn is_connected(&self) -> bool;
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool)
    -> Result<(), TelemetryError>;
}
