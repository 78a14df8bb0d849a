//! Runner configuration
//!
//! Loaded from a JSON file, then overlaid with `BYBIT_*` environment
//! variables, then validated. Anything wrong here is fatal at startup.
//!
//! ```json
//! {
//!   "exchange": { "ws_url": "wss://stream.bybit.com/v5/private", "api_key": "...", "api_secret": "..." },
//!   "session":  { "topics": ["execution.fast.linear"], "ping_interval_ms": 20000 }
//! }
//! ```

use execstream_core::{Settings, SettingsError};
use execstream_gateway::SessionConfig;
use execstream_gateway::config::{
    DEFAULT_CLOSE_TIMEOUT, DEFAULT_PING_INTERVAL, DEFAULT_RECONNECT_DELAY, DEFAULT_TOPIC,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const ENV_API_KEY: &str = "BYBIT_API_KEY";
pub const ENV_API_SECRET: &str = "BYBIT_API_SECRET";
pub const ENV_WS_URL: &str = "BYBIT_WS_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("API key/secret are missing. Set them in the config file or BYBIT_API_KEY/BYBIT_API_SECRET")]
    MissingCredentials,

    #[error("WebSocket URL is missing")]
    MissingUrl,

    #[error("Invalid WebSocket URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No topics configured, or a topic is blank")]
    NoTopics,
}

impl From<SettingsError> for ConfigError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::MissingCredentials => ConfigError::MissingCredentials,
            SettingsError::MissingUrl => ConfigError::MissingUrl,
        }
    }
}

/// Root of the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: Settings,
    #[serde(default)]
    pub session: SessionConfigJson,
}

/// Session timings (JSON representation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfigJson {
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_auth_expiry")]
    pub auth_expiry_ms: u64,
    #[serde(default = "default_close_timeout")]
    pub close_timeout_ms: u64,
}

impl Default for SessionConfigJson {
    fn default() -> Self {
        SessionConfigJson {
            topics: default_topics(),
            ping_interval_ms: default_ping_interval(),
            reconnect_delay_ms: default_reconnect_delay(),
            auth_expiry_ms: default_auth_expiry(),
            close_timeout_ms: default_close_timeout(),
        }
    }
}

impl SessionConfigJson {
    /// Convert to the gateway's SessionConfig
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            topics: self.topics.clone(),
            ping_interval: Duration::from_millis(self.ping_interval_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            auth_expiry: Duration::from_millis(self.auth_expiry_ms),
            close_timeout: Duration::from_millis(self.close_timeout_ms),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Replace exchange settings with non-blank values from `lookup`.
    ///
    /// `lookup` is normally `std::env::var(..).ok()`; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_blank(ENV_API_KEY) {
            self.exchange.api_key = key;
        }
        if let Some(secret) = non_blank(ENV_API_SECRET) {
            self.exchange.api_secret = secret;
        }
        if let Some(url) = non_blank(ENV_WS_URL) {
            self.exchange.ws_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.exchange.validate()?;

        let url = Url::parse(self.exchange.ws_url.trim()).map_err(|e| ConfigError::InvalidUrl {
            url: self.exchange.ws_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidUrl {
                url: self.exchange.ws_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.session.topics.is_empty()
            || self.session.topics.iter().any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::NoTopics);
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session.to_session_config()
    }
}

/// File → environment → validation
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::from_file(path)?;
    config.apply_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

// Default value functions for serde
fn default_topics() -> Vec<String> {
    vec![DEFAULT_TOPIC.to_string()]
}

fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL.as_millis() as u64
}

fn default_reconnect_delay() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

fn default_auth_expiry() -> u64 {
    execstream_gateway::auth::AUTH_EXPIRY.as_millis() as u64
}

fn default_close_timeout() -> u64 {
    DEFAULT_CLOSE_TIMEOUT.as_millis() as u64
}
