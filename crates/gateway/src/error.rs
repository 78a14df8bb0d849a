//! Error types for the gateway crate

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures that end one connection attempt.
///
/// All of these are recoverable: the supervisor logs them and reconnects.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection closed while waiting for auth response")]
    ClosedDuringAuth,

    #[error("Stream ended")]
    StreamEnded,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
