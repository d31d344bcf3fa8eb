//! Adapters - concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to                 |
//! |-------------|-------------------|-----------------------------|
//! | `hardware`  | ActuatorPort      | relay + LED GPIO            |
//! | `log_sink`  | EventSink         | Serial log output           |
//! | `esp::http` | HttpTransport     | ESP-IDF HTTP client         |
//! | `esp::mqtt` | MqttPort          | ESP-IDF MQTT client         |
//! | `wifi`      | Station           | ESP-IDF WiFi STA            |
//! | `time`      | -                 | ESP32 system timer          |
//! | `device_id` | -                 | eFuse MAC                   |

pub mod device_id;
#[cfg(feature = "espidf")]
pub mod esp;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod wifi;
