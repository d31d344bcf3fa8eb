//! [`MqttPort`] over the ESP-IDF MQTT client.
//!
//! The client registers a retained `offline` last-will on the
//! availability topic.  esp-mqtt reconnects on its own once created, so
//! `connect` after the first call only waits for the session to return.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use embedded_svc::mqtt::client::{EventPayload, QoS};
use esp_idf_svc::mqtt::client::{EspMqttClient, LwtConfiguration, MqttClientConfiguration};
use log::{info, warn};

use crate::app::ports::MqttPort;
use crate::error::TelemetryError;
use crate::net::telemetry::{AVAILABILITY_OFFLINE, Topics};

const CONNECT_WAIT: Duration = Duration::from_secs(5);

pub struct EspMqtt {
    broker: String,
    client_id: String,
    availability: String,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
}

impl EspMqtt {
    pub fn new(broker: &str, client_id: &str, topics: &Topics) -> Self {
        Self {
            broker: broker.to_owned(),
            client_id: client_id.to_owned(),
            availability: topics.availability.clone(),
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn create(&mut self) -> Result<(), TelemetryError> {
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            lwt: Some(LwtConfiguration {
                topic: self.availability.as_str(),
                payload: AVAILABILITY_OFFLINE,
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };
        let flag = self.connected.clone();
        let client = EspMqttClient::new_cb(&self.broker, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => flag.store(true, Ordering::Relaxed),
                EventPayload::Disconnected => flag.store(false, Ordering::Relaxed),
                EventPayload::Error(e) => warn!("MQTT | client error: {e:?}"),
                _ => {}
            }
        })
        .map_err(|e| TelemetryError::Connect(e.to_string()))?;
        info!("MQTT | client created for {}", self.broker);
        self.client = Some(client);
        Ok(())
    }
}

impl MqttPort for EspMqtt {
    fn connect(&mut self) -> Result<(), TelemetryError> {
        if self.client.is_none() {
            self.create()?;
        }
        let deadline = Instant::now() + CONNECT_WAIT;
        while !self.is_connected() {
            if Instant::now() >= deadline {
                return Err(TelemetryError::Connect(format!(
                    "no session with {} after {:?}",
                    self.broker, CONNECT_WAIT
                )));
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TelemetryError> {
        let client = self.client.as_mut().ok_or(TelemetryError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtLeastOnce, retain, payload)
            .map(|_| ())
            .map_err(|e| TelemetryError::Publish(e.to_string()))
    }
}
