//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard the state handlers read from and write
//! to: the current time, the latest inputs, the access session, the
//! actuator commands and at most one pending authorization request.
//! Handlers never perform I/O; the service applies `commands` and runs
//! `auth_request` between ticks.

use crate::config::ToolConfig;
use crate::drivers::badge::BadgeId;
use crate::drivers::led::Pattern;

// ---------------------------------------------------------------------------
// Inputs (written by the service before a tick)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// A framed badge id not yet consumed by a handler.
    pub badge_scan: Option<BadgeId>,
    /// Debounced current-sensing level.
    pub current_active: bool,
}

// ---------------------------------------------------------------------------
// Actuator commands (written by handlers, applied by the service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommands {
    pub relay: bool,
    pub green: Pattern,
    pub red: Pattern,
    /// One-shot: overlay the denial flash on the red LED.
    pub flash_red: bool,
}

impl ActuatorCommands {
    /// Relay off, red lit.
    pub fn locked() -> Self {
        Self {
            relay: false,
            green: Pattern::Off,
            red: Pattern::Solid,
            flash_red: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization round trip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Start,
    Stop,
}

impl AuthAction {
    /// Value substituted for `{{.state}}`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub action: AuthAction,
    pub badge: BadgeId,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted { duration_minutes: u32 },
    /// Denial, rejection or unreachable service.  All fail closed.
    Refused,
}

// ---------------------------------------------------------------------------
// Access session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSession {
    pub badge_id: Option<BadgeId>,
    /// Monotonic ms at which the session was granted.
    pub started_at: u64,
    /// Hard session deadline (monotonic ms).
    pub authorized_until: Option<u64>,
    pub last_activity: u64,
    /// Mirrors the last relay command the driver accepted.
    pub relay_energized: bool,
}

impl AccessSession {
    /// Forget the holder; the relay mirror is owned by the service.
    pub fn clear(&mut self) {
        self.badge_id = None;
        self.started_at = 0;
        self.authorized_until = None;
        self.last_activity = 0;
    }

    /// Whole minutes used so far, rounded up, at least one.
    pub fn used_minutes(&self, now_ms: u64) -> u32 {
        let used = now_ms.saturating_sub(self.started_at).div_ceil(60_000);
        u32::try_from(used).unwrap_or(u32::MAX).max(1)
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Monotonic time of the current tick.
    pub now_ms: u64,
    /// Ticks since the current state was entered.
    pub ticks_in_state: u64,
    pub total_ticks: u64,

    pub inputs: Inputs,
    pub session: AccessSession,
    /// Badge waiting on a `start` answer.
    pub pending_badge: Option<BadgeId>,

    pub commands: ActuatorCommands,
    pub auth_request: Option<AuthRequest>,
    pub auth_outcome: Option<AuthOutcome>,

    pub config: ToolConfig,
}

impl FsmContext {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            now_ms: 0,
            ticks_in_state: 0,
            total_ticks: 0,
            inputs: Inputs::default(),
            session: AccessSession::default(),
            pending_badge: None,
            commands: ActuatorCommands::locked(),
            auth_request: None,
            auth_outcome: None,
            config,
        }
    }

    /// Pattern for the green LED while a session is live.
    pub fn active_green_pattern(&self) -> Pattern {
        if self.inputs.current_active {
            Pattern::Solid
        } else {
            Pattern::SlowBlink
        }
    }
}
