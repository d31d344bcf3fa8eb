//! MQTT state telemetry.
//!
//! ```text
//!  ┌──────────────┐ try_send  ┌──────────────┐ receive  ┌──────────────────┐
//!  │ Control loop │──────────▶│ STATE_EVENTS │─────────▶│ Telemetry worker │──▶ broker
//!  │ (publisher)  │ never     │  (bounded)   │          │ (own thread)     │
//!  └──────────────┘ blocks    └──────────────┘          └──────────────────┘
//! ```
//!
//! The publisher side is an [`EventSink`]: every state change and every
//! current edge becomes a [`StateEvent`] pushed with `try_send`; a full
//! channel drops the event.  The worker owns the broker session, reconnects
//! with exponential backoff and drops whatever arrives while it is
//! disconnected.  On every (re)connect it announces availability, the
//! Home Assistant discovery documents and the latest known state.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};
use serde::Serialize;

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, MqttPort};
use crate::config::MqttConfig;
use crate::fsm::StateId;

/// Channel depth for outbound state events.
pub const STATE_EVENT_DEPTH: usize = 16;

pub const INITIAL_BACKOFF_MS: u64 = 2_000;
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// How long the worker waits for an event before re-checking the link.
const WORKER_POLL: Duration = Duration::from_secs(1);

pub type StateEventChannel = Channel<CriticalSectionRawMutex, StateEvent, STATE_EVENT_DEPTH>;

/// Control loop → telemetry worker.
pub static STATE_EVENTS: StateEventChannel = Channel::new();

/// JSON payload published on `{topic}/{tool}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateEvent {
    pub tool: String,
    pub state: StateId,
    /// Unix milliseconds (0 until the wall clock is synced).
    pub timestamp: u64,
    pub badge: Option<String>,
    pub relay: bool,
    pub current: bool,
}

/// Topic names for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub tool: String,
    pub state: String,
    pub availability: String,
}

impl Topics {
    pub fn new(mqtt: &MqttConfig, tool: &str) -> Self {
        let base = mqtt.topic.trim_end_matches('/');
        let state = format!("{base}/{tool}");
        let availability = format!("{state}/availability");
        Self {
            tool: tool.to_owned(),
            state,
            availability,
        }
    }

    /// Retained Home Assistant discovery documents, one per entity, all
    /// reading from the JSON state topic.
    pub fn discovery(&self) -> Vec<DiscoveryMessage> {
        DISCOVERY_ENTITIES
            .iter()
            .filter_map(|entity| {
                let config = EntityConfig {
                    name: entity.name,
                    unique_id: format!("{}_{}", self.tool, entity.object_id),
                    state_topic: &self.state,
                    value_template: entity.value_template,
                    availability_topic: &self.availability,
                    device_class: entity.device_class,
                    device: DeviceInfo {
                        name: format!("Authbox {}", self.tool),
                        identifiers: [self.tool.as_str()],
                    },
                };
                match serde_json::to_vec(&config) {
                    Ok(payload) => Some(DiscoveryMessage {
                        topic: format!(
                            "{HA_DISCOVERY_PREFIX}/{}/{}/{}/config",
                            entity.component, self.tool, entity.object_id
                        ),
                        payload,
                    }),
                    Err(e) => {
                        warn!("TELEM | discovery encode failed: {e}");
                        None
                    }
                }
            })
            .collect()
    }
}

// ───────────────────────────────────────────────────────────────
// Home Assistant discovery
// ───────────────────────────────────────────────────────────────

pub const HA_DISCOVERY_PREFIX: &str = "homeassistant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

struct DiscoveryEntity {
    component: &'static str,
    object_id: &'static str,
    name: &'static str,
    value_template: &'static str,
    device_class: Option<&'static str>,
}

// A `tag` trigger would fire on every state message that repeats the
// badge, so the badge is exposed as a plain sensor.
const DISCOVERY_ENTITIES: [DiscoveryEntity; 4] = [
    DiscoveryEntity {
        component: "sensor",
        object_id: "state",
        name: "State",
        value_template: "{{ value_json.state }}",
        device_class: None,
    },
    DiscoveryEntity {
        component: "sensor",
        object_id: "badge",
        name: "Badge",
        value_template: "{{ value_json.badge or '' }}",
        device_class: None,
    },
    DiscoveryEntity {
        component: "binary_sensor",
        object_id: "relay",
        name: "Relay",
        value_template: "{{ 'ON' if value_json.relay else 'OFF' }}",
        device_class: Some("power"),
    },
    DiscoveryEntity {
        component: "binary_sensor",
        object_id: "current",
        name: "Current",
        value_template: "{{ 'ON' if value_json.current else 'OFF' }}",
        device_class: Some("running"),
    },
];

#[derive(Serialize)]
struct EntityConfig<'a> {
    name: &'static str,
    unique_id: String,
    state_topic: &'a str,
    value_template: &'static str,
    availability_topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'static str>,
    device: DeviceInfo<'a>,
}

#[derive(Serialize)]
struct DeviceInfo<'a> {
    name: String,
    identifiers: [&'a str; 1],
}

pub const AVAILABILITY_ONLINE: &[u8] = b"online";
pub const AVAILABILITY_OFFLINE: &[u8] = b"offline";

// ───────────────────────────────────────────────────────────────
// Publisher (control-loop side)
// ───────────────────────────────────────────────────────────────

pub struct TelemetryPublisher {
    tool: String,
    channel: &'static StateEventChannel,
    clock: fn() -> u64,
    dropped: u32,
}

impl TelemetryPublisher {
    /// `clock` returns Unix milliseconds for the event timestamp.
    pub fn new(tool: &str, channel: &'static StateEventChannel, clock: fn() -> u64) -> Self {
        Self {
            tool: tool.to_owned(),
            channel,
            clock,
            dropped: 0,
        }
    }

    /// Non-blocking enqueue.  Returns `false` if the event was dropped.
    pub fn publish(&mut self, event: StateEvent) -> bool {
        if self.channel.try_send(event).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("TELEM | queue full, dropping state event ({} so far)", self.dropped);
            return false;
        }
        true
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl EventSink for TelemetryPublisher {
    fn emit(&mut self, event: &AppEvent) {
        let snapshot = match event {
            AppEvent::Started(s)
            | AppEvent::StateChanged { snapshot: s, .. }
            | AppEvent::CurrentChanged(s) => s,
            _ => return,
        };
        let event = StateEvent {
            tool: self.tool.clone(),
            state: snapshot.state,
            timestamp: (self.clock)(),
            badge: snapshot.badge.as_ref().map(|b| b.as_str().to_owned()),
            relay: snapshot.relay,
            current: snapshot.current,
        };
        self.publish(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Worker (dedicated thread)
// ───────────────────────────────────────────────────────────────

pub struct TelemetryWorker<M: MqttPort> {
    mqtt: M,
    topics: Topics,
    channel: &'static StateEventChannel,
    discovery: Vec<DiscoveryMessage>,
    last_state: Option<StateEvent>,
    connected: bool,
    backoff_ms: u64,
    next_attempt_ms: u64,
    published: u32,
    dropped: u32,
}

impl<M: MqttPort> TelemetryWorker<M> {
    pub fn new(mqtt: M, topics: Topics, channel: &'static StateEventChannel) -> Self {
        let discovery = topics.discovery();
        Self {
            mqtt,
            topics,
            channel,
            discovery,
            last_state: None,
            connected: false,
            backoff_ms: INITIAL_BACKOFF_MS,
            next_attempt_ms: 0,
            published: 0,
            dropped: 0,
        }
    }

    /// Keep the link up and publish `event` if there is one.
    pub fn service_once(&mut self, now_ms: u64, event: Option<StateEvent>) {
        self.maintain_link(now_ms);

        let Some(event) = event else {
            return;
        };
        if self.connected {
            self.publish_state(&event);
        } else {
            self.dropped = self.dropped.wrapping_add(1);
            debug!("TELEM | offline, dropped {:?} event", event.state);
        }
        // Replayed on the next connect.
        self.last_state = Some(event);
    }

    /// Thread body: receive with timeout, forever.
    pub fn run(mut self, clock: impl Fn() -> u64) {
        info!("TELEM | worker started, publishing to {}", self.topics.state);
        let channel = self.channel;
        futures_lite::future::block_on(async move {
            loop {
                let received = async { Some(channel.receive().await) };
                let timed_out = async {
                    async_io_mini::Timer::after(WORKER_POLL).await;
                    None
                };
                let event = futures_lite::future::or(received, timed_out).await;
                self.service_once(clock(), event);
            }
        });
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Current reconnect delay.
    pub fn backoff_ms(&self) -> u64 {
        self.backoff_ms
    }

    pub fn mqtt(&self) -> &M {
        &self.mqtt
    }

    pub fn mqtt_mut(&mut self) -> &mut M {
        &mut self.mqtt
    }

    fn maintain_link(&mut self, now_ms: u64) {
        if self.connected && !self.mqtt.is_connected() {
            warn!("TELEM | broker connection lost");
            self.connected = false;
            self.next_attempt_ms = now_ms.saturating_add(self.backoff_ms);
        }
        if self.connected || now_ms < self.next_attempt_ms {
            return;
        }

        match self.mqtt.connect() {
            Ok(()) => {
                self.connected = true;
                self.backoff_ms = INITIAL_BACKOFF_MS;
                info!("TELEM | connected, announcing on {}", self.topics.availability);
                if let Err(e) = self
                    .mqtt
                    .publish(&self.topics.availability, AVAILABILITY_ONLINE, true)
                {
                    warn!("TELEM | availability publish failed: {e}");
                }
                for msg in &self.discovery {
                    if let Err(e) = self.mqtt.publish(&msg.topic, &msg.payload, true) {
                        warn!("TELEM | discovery publish to {} failed: {e}", msg.topic);
                    }
                }
                if let Some(last) = self.last_state.take() {
                    self.publish_state(&last);
                    self.last_state = Some(last);
                }
            }
            Err(e) => {
                warn!("TELEM | {e}, retrying in {} ms", self.backoff_ms);
                self.next_attempt_ms = now_ms.saturating_add(self.backoff_ms);
                self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }

    fn publish_state(&mut self, event: &StateEvent) {
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("TELEM | encode failed: {e}");
                return;
            }
        };
        match self.mqtt.publish(&self.topics.state, &payload, false) {
            Ok(()) => self.published = self.published.wrapping_add(1),
            Err(e) => {
                warn!("TELEM | {e}");
                self.dropped = self.dropped.wrapping_add(1);
            }
        }
    }
}
