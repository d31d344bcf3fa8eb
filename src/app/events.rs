//! Outbound application events.
//!
//! The [`AccessService`](super::service::AccessService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  The log sink prints
//! every one; the telemetry publisher forwards state and current changes to MQTT.

use crate::drivers::badge::BadgeId;
use crate::fsm::StateId;
use crate::fsm::context::AuthAction;

/// What the tool looks like right after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: StateId,
    pub badge: Option<BadgeId>,
    pub relay: bool,
    pub current: bool,
}

/// Result of one authorization call, as reported to sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthVerdict {
    Granted { duration_minutes: u32 },
    Denied(String),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service started (carries initial snapshot).
    Started(Snapshot),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, snapshot: Snapshot },

    /// The debounced current-sense input changed.
    CurrentChanged(Snapshot),

    /// The relay was commanded (written or already in that state).
    RelaySet { energized: bool },

    /// One call to the auth service finished.
    AuthAttempt {
        badge: BadgeId,
        action: AuthAction,
        verdict: AuthVerdict,
    },

    /// A new configuration was installed.
    ConfigReloaded,
}
