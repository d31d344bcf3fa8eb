//! Boot-time configuration fetch from the control service.

use std::time::Duration;

use log::{error, info};
use url::Url;

use crate::app::ports::HttpTransport;
use crate::config::ToolConfig;
use crate::error::{ConfigError, HttpError};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ConfigClient<T: HttpTransport> {
    transport: T,
    control_url: Url,
}

impl<T: HttpTransport> ConfigClient<T> {
    pub fn new(transport: T, control_url: &str) -> Result<Self, ConfigError> {
        let control_url = Url::parse(control_url).map_err(|_| {
            ConfigError::Fetch(HttpError::InvalidUrl(control_url.to_owned()))
        })?;
        Ok(Self {
            transport,
            control_url,
        })
    }

    /// `{control_url}/config/{tool}` for a tool name.
    pub fn config_url(&self, tool: &str) -> Result<Url, ConfigError> {
        if tool.is_empty() || !tool.bytes().all(|b| b.is_ascii_alphanumeric() || b"-_.".contains(&b)) {
            return Err(ConfigError::InvalidToolName);
        }
        let mut url = self.control_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConfigError::Fetch(HttpError::InvalidUrl(self.control_url.to_string())))?
            .pop_if_empty()
            .push("config")
            .push(tool);
        Ok(url)
    }

    /// One GET, no retry.  Every failure is fatal to the caller.
    pub fn fetch(&mut self, tool: &str) -> Result<ToolConfig, ConfigError> {
        let url = self.config_url(tool)?;
        info!("CONFIG | fetching {url}");

        let response = self
            .transport
            .get(url.as_str(), FETCH_TIMEOUT)
            .map_err(ConfigError::Fetch)?;
        if !response.is_success() {
            error!("CONFIG | {url} answered HTTP {}", response.status);
            return Err(ConfigError::Fetch(HttpError::Status(response.status)));
        }

        let config = ToolConfig::from_json(&response.body)?;
        info!(
            "CONFIG | loaded: relay pin {} (active_low={}), current pin {}, idle {}s, session {} min",
            config.relay.pin,
            config.relay.active_low,
            config.current_sensing.pin,
            config.idle_duration_s,
            config.badge_auth.usage_duration_minutes,
        );
        Ok(config)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
