//! Per-tool configuration served by the control service.
//!
//! `ToolConfig` is fetched once at boot (see [`crate::net::config_client`])
//! and then passed by value to every component that needs it.  Nothing in
//! here has a default for safety-relevant fields: a config without a relay
//! or current-sensing block never gets past [`ToolConfig::from_json`].

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins::WATCHDOG_TIMEOUT_MS;

/// Placeholders that `badge_auth.url_template` must carry.
pub const URL_PLACEHOLDERS: [&str; 3] = ["badge", "state", "duration"];

/// Upper bound for `badge_reader.timeout_ms`.  An auth call may block the
/// control loop for two attempts plus the retry backoff, and all of that
/// has to fit inside the watchdog window.
pub const MAX_AUTH_TIMEOUT_MS: u32 = (WATCHDOG_TIMEOUT_MS - 1_000) / 2;

/// Core tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub badge_reader: BadgeReaderConfig,
    pub badge_auth: BadgeAuthConfig,
    pub relay: SignalConfig,
    pub current_sensing: SignalConfig,
    #[serde(alias = "led_green")]
    pub green_led: LedConfig,
    #[serde(alias = "led_red")]
    pub red_led: LedConfig,
    /// Telemetry is optional; without a broker the controller still runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<MqttConfig>,
    /// Seconds without sensed current before an unused session ends.
    pub idle_duration_s: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeReaderConfig {
    /// Informational only (reader model).
    #[serde(default)]
    pub name: String,
    /// Max gap inside one badge-read cycle; also the auth request timeout.
    pub timeout_ms: u32,
    /// Optional "card present" line from the reader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<SignalConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAuthConfig {
    /// Go-template style URL, e.g. `...?badge={{.badge}}&action={{.state}}&minutes={{.duration}}`.
    pub url_template: String,
    /// Default authorized session length.
    pub usage_duration_minutes: u32,
}

/// A digital line with polarity and debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub pin: u32,
    pub active_low: bool,
    pub debounce_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedConfig {
    pub pin: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker URI, e.g. `mqtt://control.shop:1883`.
    pub broker: String,
    pub topic: String,
}

impl ToolConfig {
    /// Parse and validate a config document.
    pub fn from_json(body: &[u8]) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_slice(body).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in URL_PLACEHOLDERS {
            if !template_has_placeholder(&self.badge_auth.url_template, name) {
                return Err(ConfigError::MissingPlaceholder(name));
            }
        }
        validate_auth_url(&self.badge_auth)?;

        let timeout = self.badge_reader.timeout_ms;
        if timeout == 0 || timeout > MAX_AUTH_TIMEOUT_MS {
            return Err(ConfigError::InvalidTiming("badge_reader.timeout_ms", timeout));
        }
        if self.idle_duration_s == 0 {
            return Err(ConfigError::InvalidTiming("idle_duration_s", 0));
        }
        if self.badge_auth.usage_duration_minutes == 0 {
            return Err(ConfigError::InvalidTiming("badge_auth.usage_duration_minutes", 0));
        }

        let mut seen = HashSet::new();
        for pin in self.pins() {
            if !seen.insert(pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
        }

        if let Some(mqtt) = &self.mqtt {
            validate_broker(&mqtt.broker)?;
        }
        Ok(())
    }

    /// Every GPIO the config claims, trigger included.
    pub fn pins(&self) -> Vec<u32> {
        let mut pins = vec![
            self.relay.pin,
            self.current_sensing.pin,
            self.green_led.pin,
            self.red_led.pin,
        ];
        if let Some(trigger) = &self.badge_reader.trigger {
            pins.push(trigger.pin);
        }
        pins
    }

    /// True when `other` changes wiring or the broker, which only a reboot
    /// can apply.
    pub fn requires_restart(&self, other: &ToolConfig) -> bool {
        self.relay != other.relay
            || self.current_sensing != other.current_sensing
            || self.green_led != other.green_led
            || self.red_led != other.red_led
            || self.badge_reader.trigger != other.badge_reader.trigger
            || self.mqtt != other.mqtt
    }

    /// Idle window in milliseconds.
    pub fn idle_duration_ms(&self) -> u64 {
        u64::from(self.idle_duration_s) * 1000
    }

    /// Default session length in milliseconds.
    pub fn usage_duration_ms(&self) -> u64 {
        minutes_to_ms(self.badge_auth.usage_duration_minutes)
    }

    /// Deadline for one authorization HTTP attempt.
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.badge_reader.timeout_ms))
    }
}

impl BadgeAuthConfig {
    /// Substitute badge, action and duration into the template.
    ///
    /// Values are query-encoded; placeholders the controller does not
    /// know about are left untouched.
    pub fn render_url(&self, badge: &str, state: &str, duration_minutes: u32) -> String {
        let duration = duration_minutes.to_string();
        let template = self.url_template.as_str();
        let mut out = String::with_capacity(template.len() + badge.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                out.push_str(&rest[open..]);
                return out;
            };
            let value = match after[..close].trim() {
                ".badge" => Some(badge),
                ".state" => Some(state),
                ".duration" => Some(duration.as_str()),
                _ => None,
            };
            match value {
                Some(v) => out.extend(url::form_urlencoded::byte_serialize(v.as_bytes())),
                None => out.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after[close + 2..];
        }
        out.push_str(rest);
        out
    }
}

pub fn minutes_to_ms(minutes: u32) -> u64 {
    u64::from(minutes) * 60_000
}

fn template_has_placeholder(template: &str, name: &str) -> bool {
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return false;
        };
        if after[..close].trim().strip_prefix('.') == Some(name) {
            return true;
        }
        rest = &after[close + 2..];
    }
    false
}

/// The rendered template must be an absolute http(s) URL.
fn validate_auth_url(auth: &BadgeAuthConfig) -> Result<(), ConfigError> {
    let rendered = auth.render_url("0", "start", 1);
    let invalid = || ConfigError::InvalidUrlTemplate(auth.url_template.clone());
    let parsed = url::Url::parse(&rendered).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(())
}

fn validate_broker(uri: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(uri).map_err(|_| ConfigError::InvalidBroker(uri.to_owned()))?;
    let scheme_ok = matches!(
        parsed.scheme(),
        "mqtt" | "mqtts" | "tcp" | "ssl" | "ws" | "wss"
    );
    if !scheme_ok || parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidBroker(uri.to_owned()));
    }
    Ok(())
}
