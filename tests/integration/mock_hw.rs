//! Mock adapters for integration tests.
//!
//! Records every actuator, auth and HTTP call so tests can assert on the
//! full command history without touching real GPIO or the network.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use authbox::app::events::AppEvent;
use authbox::app::ports::{
    ActuatorPort, AuthPort, Authorization, EventSink, HttpResponse, HttpTransport,
};
use authbox::config::ToolConfig;
use authbox::drivers::led::Pattern;
use authbox::error::{AuthError, HttpError, RelayError};
use authbox::fsm::context::AuthAction;

/// Lathe config as served by the control service (no MQTT block).
pub const TOOL_JSON: &str = r#"{
    "badge_reader": { "name": "HID OMNIKEY 5427 CK", "timeout_ms": 200 },
    "badge_auth": {
        "url_template": "http://control.shop:8000/auth?tool=lathe&badge={{.badge}}&action={{.state}}&minutes={{.duration}}",
        "usage_duration_minutes": 10
    },
    "relay": { "pin": 21, "active_low": true, "debounce_ms": 25 },
    "current_sensing": { "pin": 23, "active_low": true, "debounce_ms": 200 },
    "green_led": { "pin": 26 },
    "red_led": { "pin": 20 },
    "idle_duration_s": 5
}"#;

pub fn tool_config() -> ToolConfig {
    ToolConfig::from_json(TOOL_JSON.as_bytes()).unwrap()
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Relay(bool),
    Leds { green: Pattern, red: Pattern },
    FlashDenied,
}

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    pub fail_relay: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relay_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Relay(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn relay_writes(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Relay(on) => Some(*on),
                _ => None,
            })
            .collect()
    }

    pub fn leds(&self) -> Option<(Pattern, Pattern)> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Leds { green, red } => Some((*green, *red)),
            _ => None,
        })
    }

    pub fn denial_flashes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == ActuatorCall::FlashDenied)
            .count()
    }
}

impl ActuatorPort for MockHardware {
    fn set_relay(&mut self, energized: bool) -> Result<(), RelayError> {
        if self.fail_relay {
            return Err(RelayError::GpioWriteFailed);
        }
        self.calls.push(ActuatorCall::Relay(energized));
        Ok(())
    }

    fn set_leds(&mut self, green: Pattern, red: Pattern, _now_ms: u64) {
        if self.leds() != Some((green, red)) {
            self.calls.push(ActuatorCall::Leds { green, red });
        }
    }

    fn flash_denied(&mut self, _now_ms: u64) {
        self.calls.push(ActuatorCall::FlashDenied);
    }

    fn refresh_leds(&mut self, _now_ms: u64) {}
}

// ── Auth service ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCall {
    pub badge: String,
    pub action: AuthAction,
    pub duration_minutes: u32,
}

/// Answers from a script; grants the requested duration once it runs dry.
#[derive(Default)]
pub struct ScriptedAuth {
    pub script: VecDeque<Result<Authorization, AuthError>>,
    pub calls: Vec<AuthCall>,
}

#[allow(dead_code)]
impl ScriptedAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, answer: Result<Authorization, AuthError>) -> Self {
        self.script.push_back(answer);
        self
    }

    pub fn actions(&self) -> Vec<AuthAction> {
        self.calls.iter().map(|c| c.action).collect()
    }
}

impl AuthPort for ScriptedAuth {
    fn authorize(
        &mut self,
        badge: &str,
        action: AuthAction,
        duration_minutes: u32,
    ) -> Result<Authorization, AuthError> {
        self.calls.push(AuthCall {
            badge: badge.to_owned(),
            action,
            duration_minutes,
        });
        self.script
            .pop_front()
            .unwrap_or(Ok(Authorization { duration_minutes }))
    }
}

// ── HTTP transport ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCall {
    pub method: &'static str,
    pub url: String,
    pub timeout: Duration,
}

/// Replays canned answers; records every request.
#[derive(Default)]
pub struct MockTransport {
    pub answers: VecDeque<Result<HttpResponse, HttpError>>,
    pub calls: Vec<HttpCall>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, answer: Result<HttpResponse, HttpError>) -> Self {
        self.answers.push_back(answer);
        self
    }

    pub fn then_status(self, status: u16, body: &str) -> Self {
        self.then(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }))
    }

    fn answer(&mut self, method: &'static str, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.calls.push(HttpCall {
            method,
            url: url.to_owned(),
            timeout,
        });
        self.answers
            .pop_front()
            .unwrap_or(Err(HttpError::Transport("no scripted answer".into())))
    }
}

impl HttpTransport for MockTransport {
    fn get(&mut self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.answer("GET", url, timeout)
    }

    fn post(&mut self, url: &str, _body: &[u8], timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.answer("POST", url, timeout)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── GPIO ──────────────────────────────────────────────────────

/// Output pin whose level history is shared with the test.
#[derive(Clone, Default)]
pub struct SharedPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl embedded_hal::digital::ErrorType for SharedPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SharedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}
