//! Unified error types for the authbox firmware.
//!
//! `Error` is what the access service hands back to the control loop, and
//! only a relay failure gets that far.  Config errors stop the boot from
//! `main`; everything on the network side is classified so the access
//! state machine can fail closed.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Errors that stop the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The relay output could not be written.  Always fatal.
    Relay(RelayError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay(e) => write!(f, "relay: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config service could not be reached or answered non-2xx.
    Fetch(HttpError),
    /// The body was not valid JSON or a required field was missing.
    Malformed(String),
    /// `badge_auth.url_template` lacks one of the required placeholders.
    MissingPlaceholder(&'static str),
    /// Two I/O roles share the same pin.
    DuplicatePin(u32),
    /// Pin is outside the chip or wired to a board function.
    ReservedPin(u32),
    /// `badge_auth.url_template` does not render to an absolute http(s) URL.
    InvalidUrlTemplate(String),
    /// A timing field is zero or too long (field, value).
    InvalidTiming(&'static str, u32),
    /// `mqtt.broker` is not a usable broker URI.
    InvalidBroker(String),
    /// The tool name cannot be used in a URL path.
    InvalidToolName,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
            Self::Malformed(msg) => write!(f, "malformed: {msg}"),
            Self::MissingPlaceholder(name) => {
                write!(f, "url_template is missing the {{{{.{name}}}}} placeholder")
            }
            Self::DuplicatePin(pin) => write!(f, "pin {pin} assigned to more than one role"),
            Self::ReservedPin(pin) => write!(f, "pin {pin} is not available on this board"),
            Self::InvalidUrlTemplate(t) => {
                write!(f, "url_template '{t}' is not an absolute http(s) URL")
            }
            Self::InvalidTiming(field, value) => write!(f, "{field} = {value} is out of range"),
            Self::InvalidBroker(uri) => write!(f, "invalid MQTT broker URI '{uri}'"),
            Self::InvalidToolName => write!(f, "tool name must be non-empty URL-safe text"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// GPIO write on the relay pin failed.
    GpioWriteFailed,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

// ---------------------------------------------------------------------------
// HTTP errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The request did not complete within its deadline.
    Timeout,
    /// Connection, DNS, or socket failure.
    Transport(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The URL could not be built or parsed.
    InvalidUrl(String),
}

impl HttpError {
    /// Network-level failures worth one more attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status(code) => write!(f, "unexpected HTTP status {code}"),
            Self::InvalidUrl(url) => write!(f, "invalid URL '{url}'"),
        }
    }
}

impl std::error::Error for HttpError {}

// ---------------------------------------------------------------------------
// Authorization errors
// ---------------------------------------------------------------------------

/// Why an authorization call did not grant access.
///
/// `Denied` is a definitive answer and is never retried.  `Unavailable`
/// covers network failures after the retry budget is spent.  `Rejected`
/// is a non-2xx answer that is not a recognised denial; it is not retried
/// either, and the state machine treats it exactly like a denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Denied { status: u16, reason: String },
    Rejected { status: u16, reason: String },
    Unavailable(HttpError),
    InvalidUrl(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied { status, reason } => write!(f, "denied (HTTP {status}): {reason}"),
            Self::Rejected { status, reason } => {
                write!(f, "rejected (HTTP {status}): {reason}")
            }
            Self::Unavailable(e) => write!(f, "service unavailable: {e}"),
            Self::InvalidUrl(url) => write!(f, "cannot build auth URL '{url}'"),
        }
    }
}

impl std::error::Error for AuthError {}

// ---------------------------------------------------------------------------
// Telemetry errors (never leave the telemetry worker)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    NotConnected,
    Connect(String),
    Publish(String),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "broker not connected"),
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::Publish(msg) => write!(f, "publish failed: {msg}"),
        }
    }
}

impl std::error::Error for TelemetryError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
