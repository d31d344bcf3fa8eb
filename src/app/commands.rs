//! Inbound commands to the application service.
//!
//! The control loop translates raw input (framed badge ids, debounced
//! current edges, operator actions) into these before handing them to
//! [`AccessService`](super::service::AccessService).

use crate::config::ToolConfig;
use crate::drivers::badge::BadgeId;

#[derive(Debug, Clone)]
pub enum AppCommand {
    /// A badge id was framed (and confirmed by the trigger, if any).
    BadgeScanned(BadgeId),

    /// The debounced current-sensing level changed.
    CurrentChanged(bool),

    /// Swap in a freshly fetched config.  Only honoured while idle.
    ReloadConfig(Box<ToolConfig>),
}
