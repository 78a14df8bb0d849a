//! Reconnect loop around [`ConnectionSession`]
//!
//! Keeps exactly one session alive at a time for the life of the process.
//! Every end of a session (server close, transport failure, auth channel
//! dropped) is followed by a fixed pause and a fresh session. Only
//! cancellation stops the loop. The dedup cache lives in the router, so it
//! survives reconnects and replayed fills stay suppressed.

use execstream_core::Settings;
use execstream_ports::Clock;
use log::{error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::router::MessageRouter;
use crate::session::{ConnectionSession, SessionEnd};

/// Totals returned once the supervisor stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisorReport {
    /// Sessions started
    pub attempts: u64,
    /// Sessions that ended with an error
    pub failures: u64,
}

pub struct SessionSupervisor {
    settings: Settings,
    config: SessionConfig,
    router: MessageRouter,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    attempts: AtomicU64,
    failures: AtomicU64,
}

impl SessionSupervisor {
    pub fn new(
        settings: Settings,
        config: SessionConfig,
        router: MessageRouter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            config,
            router,
            clock,
            cancel: CancellationToken::new(),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Stop when `token` is cancelled instead of an internal one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Request shutdown; the running session closes and no new one starts
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Run sessions back to back until cancelled.
    ///
    /// Session failures are logged and never propagate.
    pub async fn run(&self) -> SupervisorReport {
        info!(
            "[WS] Supervisor starting: {} topics={:?}",
            self.settings.ws_url, self.config.topics
        );

        while !self.cancel.is_cancelled() {
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

            let mut session = ConnectionSession::new(
                &self.settings,
                &self.config,
                &self.router,
                self.clock.as_ref(),
                self.cancel.child_token(),
            );

            match session.run().await {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::ServerClosed) => {
                    info!("[WS] Session {} ended by server (attempt {})", session.id(), attempt);
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    error!("[WS] Session {} failed (attempt {}): {}", session.id(), attempt, e);
                }
            }

            info!("[WS] Reconnecting in {:?}", self.config.reconnect_delay);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        let report = self.report();
        info!(
            "[WS] Supervisor stopped after {} attempts ({} failed)",
            report.attempts, report.failures
        );
        report
    }

    pub fn report(&self) -> SupervisorReport {
        SupervisorReport {
            attempts: self.attempts(),
            failures: self.failures(),
        }
    }
}
