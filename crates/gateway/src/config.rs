//! Session timing and subscription configuration

use std::time::Duration;

use crate::auth::AUTH_EXPIRY;

/// Topic subscribed to when none are configured
pub const DEFAULT_TOPIC: &str = "execution.fast.linear";

/// Keep-alive ping period
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(20);

/// Fixed pause between connection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on the best-effort close handshake
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection behaviour shared by every session the supervisor starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Topics listed in the single subscribe request
    pub topics: Vec<String>,
    pub ping_interval: Duration,
    pub reconnect_delay: Duration,
    /// How far in the future the auth signature expires
    pub auth_expiry: Duration,
    pub close_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            topics: vec![DEFAULT_TOPIC.to_string()],
            ping_interval: DEFAULT_PING_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            auth_expiry: AUTH_EXPIRY,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}
