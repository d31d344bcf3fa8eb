//! Concrete state handler functions and table builder.
//!
//! Each state is three plain `fn` pointers.  No closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[badge]──▶ AUTHORIZING ──[granted]──▶ ACTIVE
//!    ▲                    │                       │
//!    │◀──[refused, flash]─┘     [idle | badge | deadline]
//!    │                                            ▼
//!    └──────────────[unconditional]──────── DEAUTHORIZING
//! ```
//!
//! Relay changes happen in `on_enter` only: Active energizes,
//! Deauthorizing and Idle de-energize.

use super::context::{ActuatorCommands, AuthAction, AuthOutcome, AuthRequest, FsmContext};
use super::{StateDescriptor, StateId};
use crate::config::minutes_to_ms;
use crate::drivers::led::Pattern;
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 - Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 - Authorizing
        StateDescriptor {
            id: StateId::Authorizing,
            name: "Authorizing",
            on_enter: Some(authorizing_enter),
            on_exit: Some(authorizing_exit),
            on_update: authorizing_update,
        },
        // Index 2 - Active
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: None,
            on_update: active_update,
        },
        // Index 3 - Deauthorizing
        StateDescriptor {
            id: StateId::Deauthorizing,
            name: "Deauthorizing",
            on_enter: Some(deauthorizing_enter),
            on_exit: None,
            on_update: deauthorizing_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE - relay off, red lit, waiting for a badge
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    let flash = ctx.commands.flash_red;
    ctx.commands = ActuatorCommands::locked();
    ctx.commands.flash_red = flash;
    ctx.session.clear();
    ctx.pending_badge = None;
    info!("IDLE: tool locked");
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    let badge = ctx.inputs.badge_scan.take()?;
    info!("IDLE: badge {badge} presented");
    ctx.pending_badge = Some(badge);
    Some(StateId::Authorizing)
}

// ═══════════════════════════════════════════════════════════════════════════
//  AUTHORIZING - one `start` call in flight
// ═══════════════════════════════════════════════════════════════════════════

fn authorizing_enter(ctx: &mut FsmContext) {
    ctx.auth_outcome = None;
    let Some(badge) = ctx.pending_badge.clone() else {
        warn!("AUTHORIZING: no badge pending");
        ctx.auth_outcome = Some(AuthOutcome::Refused);
        return;
    };
    ctx.auth_request = Some(AuthRequest {
        action: AuthAction::Start,
        badge,
        duration_minutes: ctx.config.badge_auth.usage_duration_minutes,
    });
}

fn authorizing_exit(ctx: &mut FsmContext) {
    ctx.auth_request = None;
}

fn authorizing_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(extra) = ctx.inputs.badge_scan.take() {
        debug!("AUTHORIZING: ignoring badge {extra} while a call is in flight");
    }

    match ctx.auth_outcome.take()? {
        AuthOutcome::Granted { duration_minutes } => {
            let now = ctx.now_ms;
            ctx.session.badge_id = ctx.pending_badge.take();
            ctx.session.started_at = now;
            ctx.session.authorized_until = Some(now.saturating_add(minutes_to_ms(duration_minutes)));
            ctx.session.last_activity = now;
            info!("AUTHORIZING: granted for {duration_minutes} min");
            Some(StateId::Active)
        }
        AuthOutcome::Refused => {
            ctx.commands.flash_red = true;
            info!("AUTHORIZING: refused");
            Some(StateId::Idle)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE - relay on, session running
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut FsmContext) {
    ctx.commands.relay = true;
    ctx.commands.red = Pattern::Off;
    ctx.commands.green = ctx.active_green_pattern();
    info!(
        "ACTIVE: tool energized until t={}ms",
        ctx.session.authorized_until.unwrap_or(ctx.now_ms)
    );
}

fn active_update(ctx: &mut FsmContext) -> Option<StateId> {
    let now = ctx.now_ms;
    if ctx.inputs.current_active {
        ctx.session.last_activity = now;
    }
    ctx.commands.green = ctx.active_green_pattern();

    // All three exits lead to the same shutdown; no precedence between them.
    let explicit_stop = ctx.inputs.badge_scan.take().is_some();
    let idle = now.saturating_sub(ctx.session.last_activity) >= ctx.config.idle_duration_ms();
    let expired = ctx.session.authorized_until.is_none_or(|until| now >= until);

    if explicit_stop || idle || expired {
        info!(
            "ACTIVE: ending session (badge={explicit_stop} idle={idle} deadline={expired})"
        );
        return Some(StateId::Deauthorizing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DEAUTHORIZING - relay off first, then best-effort `stop`
// ═══════════════════════════════════════════════════════════════════════════

fn deauthorizing_enter(ctx: &mut FsmContext) {
    ctx.commands = ActuatorCommands::locked();
    ctx.auth_outcome = None;
    match ctx.session.badge_id.clone() {
        Some(badge) => {
            ctx.auth_request = Some(AuthRequest {
                action: AuthAction::Stop,
                badge,
                duration_minutes: ctx.session.used_minutes(ctx.now_ms),
            });
        }
        None => warn!("DEAUTHORIZING: no badge on session, skipping stop call"),
    }
}

fn deauthorizing_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.auth_request = None;
    ctx.auth_outcome = None;
    Some(StateId::Idle)
}
