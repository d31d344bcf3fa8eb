//! Authbox firmware - main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   EspHttpTransport   EspMqtt   │
//! │  (ActuatorPort)    (EventSink)    (HttpTransport)    (MqttPort)│
//! │  BadgeUart         WifiSupervisor                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          AccessService (pure logic)                    │    │
//! │  │  FSM · AuthClient · TelemetryPublisher                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Control loop (10 ms) · Telemetry worker thread                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::reset::restart;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use embedded_hal::digital::InputPin;
use log::{error, info, warn};

use authbox::adapters::device_id;
use authbox::adapters::esp::badge_uart::BadgeUart;
use authbox::adapters::esp::gpio;
use authbox::adapters::esp::http::EspHttpTransport;
use authbox::adapters::esp::mqtt::EspMqtt;
use authbox::adapters::hardware::HardwareAdapter;
use authbox::adapters::log_sink::LogEventSink;
use authbox::adapters::time::{self, MonotonicClock};
use authbox::adapters::wifi::{self, WifiCredentials, WifiSupervisor};
use authbox::app::commands::AppCommand;
use authbox::app::ports::ActuatorPort;
use authbox::app::service::AccessService;
use authbox::drivers::badge::BadgeReader;
use authbox::drivers::debounce::{DebouncedPin, Edge};
use authbox::drivers::led::LedDriver;
use authbox::drivers::relay::RelayDriver;
use authbox::drivers::watchdog::Watchdog;
use authbox::fsm::StateId;
use authbox::net::auth_client::AuthClient;
use authbox::net::config_client::ConfigClient;
use authbox::net::telemetry::{STATE_EVENTS, TelemetryPublisher, TelemetryWorker, Topics};
use authbox::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Authbox v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Network ────────────────────────────────────────────
    let creds = WifiCredentials::from_build(
        option_env!("AUTHBOX_WIFI_SSID"),
        option_env!("AUTHBOX_WIFI_PASSWORD"),
    )?;
    let station = wifi::connect(peripherals.modem, sysloop, nvs, &creds)?;
    let mut wifi = WifiSupervisor::new(station);
    let _sntp = EspSntp::new_default()?;

    // ── 3. Identity + remote config (fatal on failure) ────────
    let tool = device_id::resolve_tool_name(option_env!("AUTHBOX_TOOL_NAME"), &device_id::read_mac());
    let control_url = option_env!("AUTHBOX_CONTROL_URL")
        .ok_or_else(|| anyhow!("AUTHBOX_CONTROL_URL was not set at build time"))?;
    info!("Tool '{}', control service {}", tool, control_url);

    let mut config_client = ConfigClient::new(EspHttpTransport::new(), control_url)?;
    let config = config_client.fetch(&tool)?;
    pins::check_board_pins(&config)?;

    // ── 4. GPIO ───────────────────────────────────────────────
    let relay = RelayDriver::new(gpio::output(config.relay.pin)?, config.relay.active_low)?;
    let mut hw = HardwareAdapter::new(
        relay,
        LedDriver::new(gpio::output(config.green_led.pin)?),
        LedDriver::new(gpio::output(config.red_led.pin)?),
    );
    let mut current = DebouncedPin::new(gpio::input(&config.current_sensing)?, &config.current_sensing);
    let mut trigger = config
        .badge_reader
        .trigger
        .as_ref()
        .map(gpio::input)
        .transpose()?;

    // SAFETY: the badge UART pins are reserved by `check_board_pins`
    // and never handed to a GPIO driver.
    let (tx, rx) = unsafe {
        (
            AnyIOPin::new(pins::BADGE_UART_TX_GPIO as i32),
            AnyIOPin::new(pins::BADGE_UART_RX_GPIO as i32),
        )
    };
    let mut badge_uart = BadgeUart::new(peripherals.uart1, tx, rx, pins::BADGE_UART_BAUD)?;
    let mut badges = BadgeReader::new(&config.badge_reader);

    // ── 5. Telemetry worker ───────────────────────────────────
    let publisher = match &config.mqtt {
        Some(mqtt) => {
            let topics = Topics::new(mqtt, &tool);
            let client = EspMqtt::new(&mqtt.broker, &tool, &topics);
            let worker = TelemetryWorker::new(client, topics, &STATE_EVENTS);
            std::thread::Builder::new()
                .name("telemetry".into())
                .stack_size(8 * 1024)
                .spawn(move || worker.run(time::uptime_ms))?;
            Some(TelemetryPublisher::new(&tool, &STATE_EVENTS, time::unix_ms))
        }
        None => {
            info!("TELEM | no mqtt block in config, telemetry disabled");
            None
        }
    };

    // ── 6. Access service ─────────────────────────────────────
    let clock = MonotonicClock::new();
    let mut auth = AuthClient::new(EspHttpTransport::new(), &config);
    let mut service = AccessService::new(config);
    let mut sink = (LogEventSink::new(), publisher);
    service.start(clock.now_ms(), &mut hw, &mut sink)?;

    let watchdog = Watchdog::new(pins::WATCHDOG_TIMEOUT_MS);
    let mut next_refresh = clock.now_ms() + pins::CONFIG_REFRESH_MS;

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        watchdog.feed();
        let now = clock.now_ms();
        wifi.poll(now);

        if let Some(pin) = trigger.as_mut() {
            badges.sample_trigger(InputPin::is_high(pin).unwrap_or(false), now);
        }

        let scanned = badges
            .feed(badge_uart.read_available(), now)
            .map(AppCommand::BadgeScanned);
        let current_edge = match current.poll(now) {
            Ok(edge) => edge.map(|e| AppCommand::CurrentChanged(e == Edge::Activated)),
            Err(e) => {
                warn!("CURRENT | read failed: {e:?}");
                None
            }
        };

        let calls_before = service.auth_calls();
        let mut stepped = false;
        for cmd in [scanned, current_edge].into_iter().flatten() {
            stepped = true;
            if let Err(e) = service.handle_command(cmd, now, &mut hw, &mut auth, &mut sink) {
                error!("RELAY | {e}; restarting to fail closed");
                restart();
            }
        }
        if !stepped {
            if let Err(e) = service.tick(now, &mut hw, &mut auth, &mut sink) {
                error!("RELAY | {e}; restarting to fail closed");
                restart();
            }
        }

        // Scans that queued up while an auth call blocked the loop are stale.
        if service.auth_calls() != calls_before {
            badges.discard_pending();
            badge_uart.drain();
        }

        if now >= next_refresh && service.state() == StateId::Idle {
            next_refresh = now + pins::CONFIG_REFRESH_MS;
            match config_client.fetch(&tool) {
                Ok(fresh) if service.config().requires_restart(&fresh) => {
                    warn!("CONFIG | wiring or broker changed, restarting");
                    restart();
                }
                Ok(fresh) if &fresh == service.config() => {}
                Ok(fresh) => {
                    auth.reconfigure(&fresh);
                    badges = BadgeReader::new(&fresh.badge_reader);
                    let cmd = AppCommand::ReloadConfig(Box::new(fresh));
                    if let Err(e) = service.handle_command(cmd, now, &mut hw, &mut auth, &mut sink) {
                        error!("RELAY | {e}; restarting to fail closed");
                        restart();
                    }
                }
                Err(e) => warn!("CONFIG | refresh failed ({e}), keeping current config"),
            }
        }

        hw.refresh_leds(clock.now_ms());
        std::thread::sleep(std::time::Duration::from_millis(pins::CONTROL_LOOP_POLL_MS));
    }
}
