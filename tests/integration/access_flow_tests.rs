//! End-to-end access scenarios: badge → auth → relay → idle/deadline →
//! stop call, driven through `AccessService` with mock adapters.

use authbox::adapters::hardware::HardwareAdapter;
use authbox::app::commands::AppCommand;
use authbox::app::events::{AppEvent, AuthVerdict};
use authbox::app::ports::Authorization;
use authbox::app::service::AccessService;
use authbox::drivers::badge::BadgeId;
use authbox::drivers::led::{LedDriver, Pattern};
use authbox::drivers::relay::RelayDriver;
use authbox::error::{AuthError, Error, HttpError, RelayError};
use authbox::fsm::StateId;
use authbox::fsm::context::AuthAction;

use crate::mock_hw::{MockHardware, RecordingSink, ScriptedAuth, SharedPin, tool_config};

fn badge(s: &str) -> AppCommand {
    AppCommand::BadgeScanned(BadgeId::try_from(s).unwrap())
}

struct Rig {
    svc: AccessService,
    hw: MockHardware,
    auth: ScriptedAuth,
    sink: RecordingSink,
}

impl Rig {
    fn new(auth: ScriptedAuth) -> Self {
        let mut rig = Self {
            svc: AccessService::new(tool_config()),
            hw: MockHardware::new(),
            auth,
            sink: RecordingSink::default(),
        };
        rig.svc.start(0, &mut rig.hw, &mut rig.sink).unwrap();
        rig
    }

    fn cmd(&mut self, cmd: AppCommand, now: u64) {
        self.svc
            .handle_command(cmd, now, &mut self.hw, &mut self.auth, &mut self.sink)
            .unwrap();
    }

    fn tick(&mut self, now: u64) {
        self.svc
            .tick(now, &mut self.hw, &mut self.auth, &mut self.sink)
            .unwrap();
    }

    fn states(&self) -> Vec<StateId> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { snapshot, .. } => Some(snapshot.state),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn boot_leaves_tool_locked() {
    let rig = Rig::new(ScriptedAuth::new());
    assert_eq!(rig.svc.state(), StateId::Idle);
    assert!(!rig.hw.relay_on());
    assert_eq!(rig.hw.leds(), Some((Pattern::Off, Pattern::Solid)));
    assert!(matches!(rig.sink.events[0], AppEvent::RelaySet { energized: false }));
}

#[test]
fn granted_badge_energizes_and_idle_shuts_down_after_five_seconds() {
    let mut rig = Rig::new(ScriptedAuth::new());

    rig.cmd(badge("04A1B2"), 1_000);
    assert_eq!(rig.svc.state(), StateId::Active);
    assert!(rig.hw.relay_on());
    assert_eq!(rig.hw.leds(), Some((Pattern::SlowBlink, Pattern::Off)));

    rig.tick(5_999);
    assert_eq!(rig.svc.state(), StateId::Active, "idle window not yet elapsed");

    rig.tick(6_000);
    assert_eq!(rig.svc.state(), StateId::Idle);
    assert!(!rig.hw.relay_on());
    assert_eq!(rig.auth.actions(), vec![AuthAction::Start, AuthAction::Stop]);
    assert_eq!(rig.auth.calls[1].duration_minutes, 1);
    assert_eq!(
        rig.states(),
        vec![
            StateId::Authorizing,
            StateId::Active,
            StateId::Deauthorizing,
            StateId::Idle
        ]
    );
}

#[test]
fn running_tool_stays_on_until_the_session_deadline() {
    let mut rig = Rig::new(ScriptedAuth::new());
    rig.cmd(badge("04A1B2"), 0);
    rig.cmd(AppCommand::CurrentChanged(true), 100);
    assert_eq!(rig.hw.leds(), Some((Pattern::Solid, Pattern::Off)));

    let mut t = 100;
    while t < 599_000 {
        t += 1_000;
        rig.tick(t);
        assert_eq!(rig.svc.state(), StateId::Active, "t={t}");
    }
    rig.tick(600_000);
    assert_eq!(rig.svc.state(), StateId::Idle);
    assert_eq!(rig.auth.calls[1].action, AuthAction::Stop);
    assert_eq!(rig.auth.calls[1].duration_minutes, 10);
}

#[test]
fn server_supplied_duration_sets_the_deadline() {
    let auth = ScriptedAuth::new().then(Ok(Authorization { duration_minutes: 2 }));
    let mut rig = Rig::new(auth);
    rig.cmd(badge("04A1B2"), 0);
    rig.cmd(AppCommand::CurrentChanged(true), 10);
    assert_eq!(rig.svc.session().authorized_until, Some(120_000));
    rig.tick(119_999);
    assert_eq!(rig.svc.state(), StateId::Active);
    rig.tick(120_000);
    assert_eq!(rig.svc.state(), StateId::Idle);
}

#[test]
fn second_badge_ends_the_session() {
    let mut rig = Rig::new(ScriptedAuth::new());
    rig.cmd(badge("04A1B2"), 0);
    rig.cmd(AppCommand::CurrentChanged(true), 10);
    rig.cmd(badge("04A1B2"), 90_000);
    assert_eq!(rig.svc.state(), StateId::Idle);
    assert_eq!(rig.auth.calls[1].action, AuthAction::Stop);
    assert_eq!(rig.auth.calls[1].duration_minutes, 2);
}

#[test]
fn denial_keeps_relay_off_and_flashes_red() {
    let auth = ScriptedAuth::new().then(Err(AuthError::Denied {
        status: 403,
        reason: "not trained".into(),
    }));
    let mut rig = Rig::new(auth);
    rig.cmd(badge("BADBAD"), 0);

    assert_eq!(rig.svc.state(), StateId::Idle);
    assert!(rig.hw.relay_writes().iter().all(|on| !on));
    assert_eq!(rig.hw.denial_flashes(), 1);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::AuthAttempt {
            verdict: AuthVerdict::Denied(_),
            ..
        }
    )));
}

#[test]
fn unreachable_service_on_start_fails_closed() {
    let auth = ScriptedAuth::new().then(Err(AuthError::Unavailable(HttpError::Timeout)));
    let mut rig = Rig::new(auth);
    rig.cmd(badge("04A1B2"), 0);
    assert_eq!(rig.svc.state(), StateId::Idle);
    assert!(!rig.hw.relay_on());
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::AuthAttempt {
            verdict: AuthVerdict::Unavailable(_),
            ..
        }
    )));
}

#[test]
fn unreachable_service_on_stop_still_deenergizes() {
    let auth = ScriptedAuth::new()
        .then(Ok(Authorization { duration_minutes: 10 }))
        .then(Err(AuthError::Unavailable(HttpError::Transport("down".into()))));
    let mut rig = Rig::new(auth);
    rig.cmd(badge("04A1B2"), 0);
    rig.tick(5_000);

    assert_eq!(rig.svc.state(), StateId::Idle);
    assert!(!rig.hw.relay_on());
    assert_eq!(rig.hw.relay_writes(), vec![false, false, true, false, false]);
}

#[test]
fn relay_is_off_before_the_stop_call_is_made() {
    let mut rig = Rig::new(ScriptedAuth::new());
    rig.cmd(badge("04A1B2"), 0);
    rig.tick(5_000);

    let stop_idx = rig
        .sink
        .events
        .iter()
        .position(|e| matches!(e, AppEvent::AuthAttempt { action: AuthAction::Stop, .. }))
        .unwrap();
    let relay_off_idx = rig
        .sink
        .events
        .iter()
        .rposition(|e| matches!(e, AppEvent::RelaySet { energized: true }))
        .map(|on| {
            on + rig.sink.events[on..]
                .iter()
                .position(|e| matches!(e, AppEvent::RelaySet { energized: false }))
                .unwrap()
        })
        .unwrap();
    assert!(relay_off_idx < stop_idx);
}

#[test]
fn config_reload_applies_only_while_idle() {
    let mut rig = Rig::new(ScriptedAuth::new());
    let mut longer = tool_config();
    longer.idle_duration_s = 30;

    rig.cmd(badge("04A1B2"), 0);
    rig.cmd(AppCommand::ReloadConfig(Box::new(longer.clone())), 10);
    assert_eq!(rig.svc.config().idle_duration_s, 5);

    rig.tick(5_000);
    rig.cmd(AppCommand::ReloadConfig(Box::new(longer)), 5_010);
    assert_eq!(rig.svc.config().idle_duration_s, 30);
    assert!(rig.sink.events.contains(&AppEvent::ConfigReloaded));
}

#[test]
fn relay_write_failure_is_returned() {
    let mut rig = Rig::new(ScriptedAuth::new());
    rig.hw.fail_relay = true;
    let err = rig
        .svc
        .handle_command(badge("04A1B2"), 0, &mut rig.hw, &mut rig.auth, &mut rig.sink)
        .unwrap_err();
    assert_eq!(err, Error::Relay(RelayError::GpioWriteFailed));
}

#[test]
fn hardware_adapter_writes_relay_pin_once_per_change() {
    let relay_pin = SharedPin::default();
    let levels = relay_pin.levels.clone();
    let relay = RelayDriver::new(relay_pin, true).unwrap();
    let mut hw = HardwareAdapter::new(
        relay,
        LedDriver::new(SharedPin::default()),
        LedDriver::new(SharedPin::default()),
    );
    let mut svc = AccessService::new(tool_config());
    let mut auth = ScriptedAuth::new();
    let mut sink = RecordingSink::default();

    svc.start(0, &mut hw, &mut sink).unwrap();
    svc.handle_command(badge("04A1B2"), 0, &mut hw, &mut auth, &mut sink)
        .unwrap();
    svc.tick(5_000, &mut hw, &mut auth, &mut sink).unwrap();

    // Active-low: high = off.  Construction, on, off.
    assert_eq!(*levels.borrow(), vec![true, false, true]);
    assert!(!hw.relay().is_energized());
}
