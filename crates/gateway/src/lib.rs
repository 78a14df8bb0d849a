//! execstream Gateway
//!
//! Connection layer for the private execution stream. Provides:
//! - Request signing and the `auth`/`subscribe`/`ping` wire messages
//! - A single-connection session state machine
//! - Frame routing with dedup into an [`ExecutionSink`](execstream_ports::ExecutionSink)
//! - A supervisor that reconnects forever until cancelled
//!
//! ## Architecture
//!
//! ```text
//! Exchange private stream (wss)
//!         │
//!   ┌─────▼──────┐   reconnect after delay
//!   │ Supervisor │◄──────────────┐
//!   └─────┬──────┘               │
//!   ┌─────▼──────┐  auth, sub,   │
//!   │  Session   │  ping ────────┘ on close / error
//!   └─────┬──────┘
//!         │ text frames
//!   ┌─────▼──────┐   ┌────────────┐
//!   │   Router   │──►│ DedupCache │
//!   └─────┬──────┘   └────────────┘
//!         │ ExecutionEvent
//!   ┌─────▼──────┐
//!   │    Sink    │
//!   └────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod messages;
pub mod router;
pub mod session;
pub mod sink;
pub mod supervisor;

// Re-export commonly used types
pub use auth::{AuthChallenge, sign};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use messages::{OpResponse, WsRequest};
pub use router::{FrameKind, MessageRouter};
pub use session::{ConnectionSession, SessionEnd, SessionState};
pub use sink::ChannelSink;
pub use supervisor::{SessionSupervisor, SupervisorReport};
