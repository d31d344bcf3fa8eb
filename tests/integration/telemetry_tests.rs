//! Access service → telemetry publisher → channel → worker → broker.

use authbox::adapters::log_sink::LogEventSink;
use authbox::app::commands::AppCommand;
use authbox::app::ports::MqttPort;
use authbox::app::service::AccessService;
use authbox::config::MqttConfig;
use authbox::drivers::badge::BadgeId;
use authbox::error::TelemetryError;
use authbox::net::telemetry::{
    AVAILABILITY_ONLINE, StateEventChannel, TelemetryPublisher, TelemetryWorker, Topics,
};
use embassy_sync::channel::Channel;

use crate::mock_hw::{MockHardware, ScriptedAuth, tool_config};

#[derive(Default)]
struct Broker {
    up: bool,
    messages: Vec<(String, serde_json::Value, bool)>,
}

impl MqttPort for Broker {
    fn connect(&mut self) -> Result<(), TelemetryError> {
        self.up = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.up
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TelemetryError> {
        let value = serde_json::from_slice(payload)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(payload).into()));
        self.messages.push((topic.to_owned(), value, retain));
        Ok(())
    }
}

fn unix_clock() -> u64 {
    1_700_000_000_000
}

fn drain(worker: &mut TelemetryWorker<Broker>, ch: &'static StateEventChannel, now: u64) {
    while let Ok(ev) = ch.try_receive() {
        worker.service_once(now, Some(ev));
    }
}

#[test]
fn session_lifecycle_reaches_the_broker_in_order() {
    let ch: &'static StateEventChannel = Box::leak(Box::new(Channel::new()));
    let mqtt = MqttConfig {
        broker: "mqtt://control.shop:1883".into(),
        topic: "shop".into(),
    };
    let topics = Topics::new(&mqtt, "lathe");
    let mut worker = TelemetryWorker::new(Broker::default(), topics, ch);

    let mut svc = AccessService::new(tool_config());
    let mut hw = MockHardware::new();
    let mut auth = ScriptedAuth::new();
    let mut sink = (LogEventSink::new(), TelemetryPublisher::new("lathe", ch, unix_clock));

    svc.start(0, &mut hw, &mut sink).unwrap();
    let scan = AppCommand::BadgeScanned(BadgeId::try_from("04A1B2").unwrap());
    svc.handle_command(scan, 0, &mut hw, &mut auth, &mut sink)
        .unwrap();
    svc.tick(5_000, &mut hw, &mut auth, &mut sink).unwrap();
    drain(&mut worker, ch, 5_000);

    let msgs = &worker.mqtt().messages;
    assert_eq!(msgs[0].0, "shop/lathe/availability");
    assert_eq!(msgs[0].1, serde_json::Value::String("online".into()));
    assert!(msgs[0].2);
    assert_eq!(AVAILABILITY_ONLINE, b"online");

    let discovery = &msgs[1..5];
    assert!(discovery
        .iter()
        .all(|(topic, v, retain)| topic.starts_with("homeassistant/")
            && topic.ends_with("/config")
            && v["state_topic"] == "shop/lathe"
            && *retain));

    let states: Vec<&str> = msgs[5..]
        .iter()
        .map(|(topic, v, retain)| {
            assert_eq!(topic, "shop/lathe");
            assert!(!retain);
            v["state"].as_str().unwrap()
        })
        .collect();
    assert_eq!(
        states,
        vec!["idle", "authorizing", "active", "deauthorizing", "idle"]
    );

    let active = &msgs[7].1;
    assert_eq!(active["badge"], "04A1B2");
    assert_eq!(active["relay"], true);
    assert_eq!(active["tool"], "lathe");
    assert_eq!(active["timestamp"], 1_700_000_000_000u64);
    assert_eq!(worker.published(), 5);
}

#[test]
fn offline_worker_drops_instead_of_queueing() {
    struct Down;
    impl MqttPort for Down {
        fn connect(&mut self) -> Result<(), TelemetryError> {
            Err(TelemetryError::Connect("unreachable".into()))
        }
        fn is_connected(&self) -> bool {
            false
        }
        fn publish(&mut self, _: &str, _: &[u8], _: bool) -> Result<(), TelemetryError> {
            Err(TelemetryError::NotConnected)
        }
    }

    let ch: &'static StateEventChannel = Box::leak(Box::new(Channel::new()));
    let mqtt = MqttConfig {
        broker: "mqtt://control.shop:1883".into(),
        topic: "shop".into(),
    };
    let topics = Topics::new(&mqtt, "lathe");
    let mut worker = TelemetryWorker::new(Down, topics, ch);
    let mut svc = AccessService::new(tool_config());
    let mut sink = TelemetryPublisher::new("lathe", ch, unix_clock);
    svc.start(0, &mut MockHardware::new(), &mut sink).unwrap();

    let ev = ch.try_receive().unwrap();
    worker.service_once(0, Some(ev));
    assert_eq!(worker.dropped(), 1);
    assert_eq!(worker.published(), 0);
}

#[test]
fn current_edges_and_outage_reach_the_broker() {
    let ch: &'static StateEventChannel = Box::leak(Box::new(Channel::new()));
    let mqtt = MqttConfig {
        broker: "mqtt://control.shop:1883".into(),
        topic: "shop".into(),
    };
    let mut worker = TelemetryWorker::new(Broker::default(), Topics::new(&mqtt, "lathe"), ch);

    let mut svc = AccessService::new(tool_config());
    let mut hw = MockHardware::new();
    let mut auth = ScriptedAuth::new();
    let mut sink = TelemetryPublisher::new("lathe", ch, unix_clock);

    svc.start(0, &mut hw, &mut sink).unwrap();
    let scan = AppCommand::BadgeScanned(BadgeId::try_from("04A1B2").unwrap());
    svc.handle_command(scan, 0, &mut hw, &mut auth, &mut sink)
        .unwrap();
    drain(&mut worker, ch, 0);

    // Broker goes away; the tool starts drawing current meanwhile.
    worker.mqtt_mut().up = false;
    svc.handle_command(AppCommand::CurrentChanged(true), 100, &mut hw, &mut auth, &mut sink)
        .unwrap();
    drain(&mut worker, ch, 100);
    assert!(!worker.is_connected());
    worker.mqtt_mut().messages.clear();

    worker.service_once(5_000, None);
    let msgs = &worker.mqtt().messages;
    assert_eq!(msgs[0].0, "shop/lathe/availability");
    let last = msgs.last().unwrap();
    assert_eq!(last.0, "shop/lathe");
    assert_eq!(last.1["state"], "active");
    assert_eq!(last.1["current"], true);
    assert_eq!(last.1["relay"], true);
}
