//! Network clients: boot config fetch, badge authorization, MQTT telemetry.
//!
//! All three talk through the [`HttpTransport`](crate::app::ports::HttpTransport)
//! and [`MqttPort`](crate::app::ports::MqttPort) seams, so they run
//! unchanged against the ESP-IDF stack and host test doubles.

pub mod auth_client;
pub mod config_client;
pub mod telemetry;
