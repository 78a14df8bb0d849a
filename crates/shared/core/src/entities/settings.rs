use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Connection settings for the private stream
///
/// Immutable for the lifetime of the process. The session borrows it and
/// never alters it.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Private WebSocket endpoint (e.g. `wss://stream.bybit.com/v5/private`)
    #[serde(default)]
    pub ws_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("API key/secret are missing")]
    MissingCredentials,
    #[error("WebSocket URL is missing")]
    MissingUrl,
}

impl Settings {
    pub fn new(
        ws_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Check the preconditions a session relies on
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err(SettingsError::MissingCredentials);
        }
        if self.ws_url.trim().is_empty() {
            return Err(SettingsError::MissingUrl);
        }
        Ok(())
    }
}

// Keep the secret out of logs
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("ws_url", &self.ws_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}
