//! Badge authorization round trip.
//!
//! ## Response classification
//!
//! | Answer                                  | Result                       |
//! |-----------------------------------------|------------------------------|
//! | 2xx, empty / non-JSON body              | granted, requested duration  |
//! | 2xx, `{"duration_minutes": n}` (n > 0)  | granted for `n` minutes      |
//! | 2xx, `{"authorized": false, ...}`       | `Denied`                     |
//! | 401 / 403                               | `Denied`                     |
//! | any other status                        | `Rejected`                   |
//! | timeout / connection failure            | one retry, then `Unavailable`|
//!
//! Denials are never retried.

use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::app::ports::{AuthPort, Authorization, HttpResponse, HttpTransport};
use crate::config::{BadgeAuthConfig, MAX_AUTH_TIMEOUT_MS, ToolConfig};
use crate::error::{AuthError, HttpError};
use crate::fsm::context::AuthAction;

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

// Worst case: both attempts time out.  The loop must still feed the watchdog.
const _: () = assert!(
    2 * MAX_AUTH_TIMEOUT_MS as u128 + DEFAULT_RETRY_BACKOFF.as_millis()
        < crate::pins::WATCHDOG_TIMEOUT_MS as u128
);

/// Longest denial reason kept from a response body.
const MAX_REASON_LEN: usize = 256;

#[derive(Debug, Default, Deserialize)]
struct AuthBody {
    authorized: Option<bool>,
    duration_minutes: Option<u32>,
    reason: Option<String>,
}

pub struct AuthClient<T: HttpTransport> {
    transport: T,
    auth: BadgeAuthConfig,
    timeout: Duration,
    retry_backoff: Duration,
}

impl<T: HttpTransport> AuthClient<T> {
    /// Request timeout comes from `badge_reader.timeout_ms`.
    pub fn new(transport: T, config: &ToolConfig) -> Self {
        Self {
            transport,
            auth: config.badge_auth.clone(),
            timeout: config.auth_timeout(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Install a reloaded config's template and timeout.
    pub fn reconfigure(&mut self, config: &ToolConfig) {
        self.auth = config.badge_auth.clone();
        self.timeout = config.auth_timeout();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn post_with_retry(&mut self, url: &str) -> Result<HttpResponse, HttpError> {
        match self.transport.post(url, &[], self.timeout) {
            Err(e) if e.is_transient() => {
                warn!("AUTH | {e}, retrying in {:?}", self.retry_backoff);
                if !self.retry_backoff.is_zero() {
                    std::thread::sleep(self.retry_backoff);
                }
                self.transport.post(url, &[], self.timeout)
            }
            other => other,
        }
    }
}

impl<T: HttpTransport> AuthPort for AuthClient<T> {
    fn authorize(
        &mut self,
        badge: &str,
        action: AuthAction,
        duration_minutes: u32,
    ) -> Result<Authorization, AuthError> {
        let url = self.auth.render_url(badge, action.as_str(), duration_minutes);
        if url::Url::parse(&url).is_err() {
            return Err(AuthError::InvalidUrl(url));
        }

        let response = self.post_with_retry(&url).map_err(|e| match e {
            HttpError::InvalidUrl(u) => AuthError::InvalidUrl(u),
            other => AuthError::Unavailable(other),
        })?;

        classify(&response, duration_minutes)
    }
}

fn classify(response: &HttpResponse, requested: u32) -> Result<Authorization, AuthError> {
    let status = response.status;
    match status {
        200..=299 => {
            let body: AuthBody = serde_json::from_slice(&response.body).unwrap_or_default();
            if body.authorized == Some(false) {
                return Err(AuthError::Denied {
                    status,
                    reason: body
                        .reason
                        .map_or_else(|| "not authorized".to_owned(), |r| truncate(&r)),
                });
            }
            let duration_minutes = body
                .duration_minutes
                .filter(|&n| n > 0)
                .unwrap_or(requested);
            Ok(Authorization { duration_minutes })
        }
        401 | 403 => Err(AuthError::Denied {
            status,
            reason: body_text(&response.body),
        }),
        _ => Err(AuthError::Rejected {
            status,
            reason: body_text(&response.body),
        }),
    }
}

fn body_text(body: &[u8]) -> String {
    truncate(String::from_utf8_lossy(body).trim())
}

fn truncate(s: &str) -> String {
    if s.len() <= MAX_REASON_LEN {
        return s.to_owned();
    }
    let mut end = MAX_REASON_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}
