//! Bridge Configuration Settings
//!
//! Locates the terminal gateway. Loaded from environment variables; the
//! host call arguments never come from here.

use std::time::Duration;

use crate::application::services::REFDATA_SERVICE;

/// Gateway session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Service opened for every call.
    pub service: String,
    /// Use `wss://` instead of `ws://`.
    pub tls: bool,
    /// Connect timeout (`None` = wait for the OS).
    pub connect_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8194,
            service: REFDATA_SERVICE.to_string(),
            tls: false,
            connect_timeout: None,
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Gateway session settings.
    pub session: SessionSettings,
}

impl BridgeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or service is set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = SessionSettings::default();

        let host = parse_env_string("HISTORY_LINK_HOST", &defaults.host)?;
        let service = parse_env_string("HISTORY_LINK_SERVICE", &defaults.service)?;

        let session = SessionSettings {
            host,
            port: parse_env_u16("HISTORY_LINK_PORT", defaults.port),
            service,
            tls: parse_env_bool("HISTORY_LINK_TLS", defaults.tls),
            connect_timeout: parse_env_duration_secs("HISTORY_LINK_CONNECT_TIMEOUT_SECS"),
        };

        Ok(Self { session })
    }

    /// Override the gateway endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            self.session.host = host;
        }
        if let Some(port) = port {
            self.session.port = port;
        }
        self
    }

    /// Gateway WebSocket URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.session.tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}/", self.session.host, self.session.port)
    }

    /// `host:port` label for diagnostics.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.session.host, self.session.port)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_string(key: &str, default: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
        Ok(v) => Ok(v),
        Err(_) => Ok(default.to_string()),
    }
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
