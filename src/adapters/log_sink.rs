//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event to the ESP-IDF logger (UART / USB-CDC).

use log::{info, warn};

use crate::app::events::{AppEvent, AuthVerdict, Snapshot};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn badge_or_dash(s: &Snapshot) -> &str {
    s.badge.as_deref().unwrap_or("-")
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(s) => {
                info!("START | state={:?} relay={}", s.state, s.relay);
            }
            AppEvent::StateChanged { from, snapshot: s } => {
                info!(
                    "STATE | {:?} -> {:?} | badge={} relay={} current={}",
                    from,
                    s.state,
                    badge_or_dash(s),
                    s.relay,
                    s.current
                );
            }
            AppEvent::CurrentChanged(s) => {
                info!("CURRENT | {} in {:?}", if s.current { "drawing" } else { "quiet" }, s.state);
            }
            AppEvent::RelaySet { energized } => {
                info!("RELAY | {}", if *energized { "ON" } else { "OFF" });
            }
            AppEvent::AuthAttempt {
                badge,
                action,
                verdict,
            } => match verdict {
                AuthVerdict::Granted { duration_minutes } => info!(
                    "AUTH | badge={} action={} outcome=granted minutes={}",
                    badge,
                    action.as_str(),
                    duration_minutes
                ),
                AuthVerdict::Denied(why) => warn!(
                    "AUTH | badge={} action={} outcome=denied ({})",
                    badge,
                    action.as_str(),
                    why
                ),
                AuthVerdict::Unavailable(why) => warn!(
                    "AUTH | badge={} action={} outcome=unavailable ({})",
                    badge,
                    action.as_str(),
                    why
                ),
            },
            AppEvent::ConfigReloaded => {
                info!("CONFIG | reloaded");
            }
        }
    }
}
