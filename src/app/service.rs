//! Application service - the hexagonal core.
//!
//! [`AccessService`] owns the FSM and its context.  It is the only caller
//! of the relay and of the auth service, and the only owner of the
//! access session.
//!
//! ```text
//!  AppCommand ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │     AccessService       │
//! ActuatorPort ◀──│  FSM · session · auth   │──▶ AuthPort
//!                 └────────────────────────┘
//! ```
//!
//! One cycle: tick the FSM, apply relay and LED commands, then, while a
//! handler has left an auth request, run it synchronously and tick again.
//! A state's relay command is therefore applied before its auth call.

use log::{info, warn};

use crate::config::ToolConfig;
use crate::error::{AuthError, Result};
use crate::fsm::context::{AccessSession, AuthOutcome, AuthRequest, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

use super::commands::AppCommand;
use super::events::{AppEvent, AuthVerdict, Snapshot};
use super::ports::{ActuatorPort, AuthPort, EventSink};

pub struct AccessService {
    fsm: Fsm,
    ctx: FsmContext,
    auth_calls: u64,
}

impl AccessService {
    /// Does not start the FSM; call [`start`](Self::start) next.
    pub fn new(config: ToolConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(config),
            auth_calls: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter Idle and drive the outputs to their locked levels.
    pub fn start(
        &mut self,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        self.apply_relay(hw, sink)?;
        self.apply_leds(hw);
        sink.emit(&AppEvent::Started(self.snapshot()));
        info!("AccessService started in {:?}", self.state());
        Ok(())
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Record a command and run one cycle.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        auth: &mut impl AuthPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::BadgeScanned(badge) => self.ctx.inputs.badge_scan = Some(badge),
            AppCommand::CurrentChanged(active) => {
                let changed = self.ctx.inputs.current_active != active;
                self.ctx.inputs.current_active = active;
                self.tick(now_ms, hw, auth, sink)?;
                if changed {
                    sink.emit(&AppEvent::CurrentChanged(self.snapshot()));
                }
                return Ok(());
            }
            AppCommand::ReloadConfig(config) => {
                if self.state() == StateId::Idle {
                    self.ctx.config = *config;
                    sink.emit(&AppEvent::ConfigReloaded);
                    info!("Configuration reloaded");
                } else {
                    warn!("Config reload ignored in {:?}", self.state());
                }
                return Ok(());
            }
        }
        self.tick(now_ms, hw, auth, sink)
    }

    /// Run one control cycle at `now_ms`.
    ///
    /// Only a relay write failure is returned; it must stop the loop.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        auth: &mut impl AuthPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.ctx.now_ms = now_ms;
        self.step(hw, sink)?;

        while let Some(request) = self.ctx.auth_request.take() {
            let outcome = self.call_auth(&request, auth, sink);
            self.ctx.auth_outcome = Some(outcome);
            self.step(hw, sink)?;
        }

        // A scan nobody consumed this cycle is stale by the next one.
        self.ctx.inputs.badge_scan = None;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn session(&self) -> &AccessSession {
        &self.ctx.session
    }

    pub fn config(&self) -> &ToolConfig {
        &self.ctx.config
    }

    /// Auth round trips performed so far.  The control loop compares
    /// this across a cycle to spot that it was blocked on the network.
    pub fn auth_calls(&self) -> u64 {
        self.auth_calls
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state(),
            badge: self.ctx.session.badge_id.clone(),
            relay: self.ctx.session.relay_energized,
            current: self.ctx.inputs.current_active,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn step(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> Result<()> {
        let from = self.state();
        if self.fsm.tick(&mut self.ctx).is_some() {
            self.apply_relay(hw, sink)?;
            sink.emit(&AppEvent::StateChanged {
                from,
                snapshot: self.snapshot(),
            });
        }
        self.apply_leds(hw);
        Ok(())
    }

    fn apply_relay(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> Result<()> {
        let energized = self.ctx.commands.relay;
        hw.set_relay(energized)?;
        self.ctx.session.relay_energized = energized;
        sink.emit(&AppEvent::RelaySet { energized });
        Ok(())
    }

    fn apply_leds(&mut self, hw: &mut impl ActuatorPort) {
        let now = self.ctx.now_ms;
        let cmds = &mut self.ctx.commands;
        hw.set_leds(cmds.green, cmds.red, now);
        if cmds.flash_red {
            hw.flash_denied(now);
            cmds.flash_red = false;
        }
    }

    fn call_auth(
        &mut self,
        request: &AuthRequest,
        auth: &mut impl AuthPort,
        sink: &mut impl EventSink,
    ) -> AuthOutcome {
        self.auth_calls += 1;
        let result = auth.authorize(&request.badge, request.action, request.duration_minutes);

        let (outcome, verdict) = match result {
            Ok(granted) => (
                AuthOutcome::Granted {
                    duration_minutes: granted.duration_minutes,
                },
                AuthVerdict::Granted {
                    duration_minutes: granted.duration_minutes,
                },
            ),
            Err(e @ (AuthError::Denied { .. } | AuthError::Rejected { .. })) => {
                (AuthOutcome::Refused, AuthVerdict::Denied(e.to_string()))
            }
            Err(e) => (AuthOutcome::Refused, AuthVerdict::Unavailable(e.to_string())),
        };

        sink.emit(&AppEvent::AuthAttempt {
            badge: request.badge.clone(),
            action: request.action,
            verdict,
        });
        outcome
    }
}
