//! execstream Runner
//!
//! Wires the pieces together for the `execstream` binary:
//!
//! - **Config**: JSON file + `BYBIT_*` environment overrides
//! - **Sink**: console output, one line per execution
//! - **Supervisor**: one reconnecting session with a shared dedup cache
//!
//! ## Architecture
//!
//! ```text
//!   config.json ──► AppConfig ◄── BYBIT_API_KEY / BYBIT_API_SECRET / BYBIT_WS_URL
//!                      │
//!                      ▼
//!              ┌───────────────┐      ctrl-c
//!              │  Supervisor   │◄──── CancellationToken
//!              └───────┬───────┘
//!                      │ ExecutionEvent
//!                      ▼
//!              ┌───────────────┐
//!              │  ConsoleSink  │──► stdout
//!              └───────────────┘
//! ```

pub mod config;
pub mod sink;

use execstream_clock::SystemClock;
use execstream_core::DedupCache;
use execstream_gateway::{MessageRouter, SessionSupervisor};
use execstream_ports::ExecutionSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use config::{AppConfig, ConfigError, DEFAULT_CONFIG_PATH, load_config};
pub use sink::{ConsoleSink, format_execution};

/// Build a supervisor for `config` that emits into `sink` and stops on `cancel`
pub fn build_supervisor(
    config: &AppConfig,
    sink: Arc<dyn ExecutionSink>,
    cancel: CancellationToken,
) -> SessionSupervisor {
    let router = MessageRouter::new(Arc::new(DedupCache::new()), sink);

    SessionSupervisor::new(
        config.exchange.clone(),
        config.session_config(),
        router,
        Arc::new(SystemClock::new()),
    )
    .with_cancellation(cancel)
}
