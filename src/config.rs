use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const BASE_URL_ENV: &str = "ENDPOINT_CLIENT_BASE_URL";
pub const TIMEOUT_ENV: &str = "ENDPOINT_CLIENT_TIMEOUT_MS";

/// Process-wide client configuration.
///
/// Created once at startup and handed to [`crate::EndpointClient`], which
/// keeps it behind an `Arc` and never mutates it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to. Only checked when a
    /// request URL is built, so a bad value surfaces as a call error.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Timeout applied to calls whose endpoint does not set its own.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_max_connections_per_host")]
    pub max_connections_per_host: usize,
}

fn default_base_url() -> String {
    "https://api.magicthegathering.io".to_string()
}

fn default_user_agent() -> String {
    format!("endpoint-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_connections_per_host() -> usize {
    100
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_ms: None,
            max_connections_per_host: default_max_connections_per_host(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `ENDPOINT_CLIENT_BASE_URL` and
    /// `ENDPOINT_CLIENT_TIMEOUT_MS`. An unparsable timeout is ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(millis) => config.request_timeout_ms = Some(millis),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid {}", TIMEOUT_ENV),
            }
        }
        config
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        // Round sub-millisecond remainders up so a short timeout never becomes zero.
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.request_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
