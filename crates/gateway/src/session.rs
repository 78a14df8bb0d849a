//! One physical connection to the private stream
//!
//! A [`ConnectionSession`] walks through
//! `Connecting → Authenticating → Subscribing → Streaming → Closing → Closed`
//! exactly once. Any transport error ends the attempt in `Failed`; the
//! supervisor decides whether to try again.
//!
//! While streaming, two activities share the split connection:
//!
//! ```text
//!            ┌──────────────┐   text frames   ┌───────────────┐
//!  read  ───►│   receive    │────────────────►│ MessageRouter │
//!            └──────────────┘                 └───────────────┘
//!            ┌──────────────┐
//!  write ◄───│  keep-alive  │  {"op":"ping"} every ping_interval
//!            └──────────────┘
//! ```
//!
//! Whichever finishes first (or cancellation) ends streaming; the other is
//! dropped mid-flight.

use execstream_core::Settings;
use execstream_ports::Clock;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::AuthChallenge;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::messages::{WsRequest, response::is_auth_rejected};
use crate::router::MessageRouter;

/// Type alias for the WebSocket connection.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Process-wide ping sequence, keeps `req_id` unique across sessions
static PING_SEQ: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a single connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Subscribing,
    Streaming,
    Closing,
    Closed,
    Failed,
}

/// Why a session finished without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The cancellation token fired
    Cancelled,
    /// The server sent a Close frame
    ServerClosed,
}

/// Next complete message from the read half
enum Inbound {
    Text(String),
    Close(Option<CloseFrame>),
    End,
}

/// A single connect → stream → close cycle.
///
/// Owns the transport for its whole life and releases it on every exit
/// path. Not reusable: build a new one per attempt.
pub struct ConnectionSession<'a> {
    id: Uuid,
    settings: &'a Settings,
    config: &'a SessionConfig,
    router: &'a MessageRouter,
    clock: &'a dyn Clock,
    cancel: CancellationToken,
    state: SessionState,
}

impl<'a> ConnectionSession<'a> {
    pub fn new(
        settings: &'a Settings,
        config: &'a SessionConfig,
        router: &'a MessageRouter,
        clock: &'a dyn Clock,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            config,
            router,
            clock,
            cancel,
            state: SessionState::Connecting,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok` when the server closed the connection or the token was
    /// cancelled; any transport failure comes back as `Err` with the session
    /// left in [`SessionState::Failed`].
    pub async fn run(&mut self) -> SessionResult<SessionEnd> {
        self.transition(SessionState::Connecting);
        info!("[WS] Connecting to {} (session {})", self.settings.ws_url, self.id);

        let Some(connected) =
            or_cancelled(&self.cancel, connect_async(self.settings.ws_url.as_str())).await
        else {
            self.transition(SessionState::Closed);
            return Ok(SessionEnd::Cancelled);
        };

        let (ws, _response) = match connected {
            Ok(conn) => conn,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(SessionError::Connect(e));
            }
        };
        info!("[WS] Connected (session {})", self.id);

        let (mut write, mut read) = ws.split();
        let result = self.drive(&mut write, &mut read).await;

        self.close(&mut write).await;
        drop(read);

        match &result {
            Ok(_) => self.transition(SessionState::Closed),
            Err(_) => self.transition(SessionState::Failed),
        }
        result
    }

    /// Authenticate, subscribe, then stream until something ends it
    async fn drive(&mut self, write: &mut WsSink, read: &mut WsSource) -> SessionResult<SessionEnd> {
        self.transition(SessionState::Authenticating);
        if !self.authenticate(write, read).await? {
            return Ok(SessionEnd::Cancelled);
        }

        self.transition(SessionState::Subscribing);
        let subscribe = WsRequest::subscribe(self.config.topics.clone());
        match or_cancelled(&self.cancel, send_request(write, &subscribe)).await {
            Some(sent) => sent?,
            None => return Ok(SessionEnd::Cancelled),
        }
        info!("[SUBSCRIBE] {}", self.config.topics.join(", "));

        self.transition(SessionState::Streaming);
        let cancel = self.cancel.clone();
        let this = &*self;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[WS] Cancellation requested (session {})", this.id);
                Ok(SessionEnd::Cancelled)
            }
            received = this.receive(read) => received,
            pinged = this.keep_alive(write) => pinged,
        }
    }

    /// Send the signed auth request and read exactly one reply.
    ///
    /// A rejection is only logged; the session carries on unauthenticated.
    /// Returns `false` if cancelled while waiting.
    async fn authenticate(&self, write: &mut WsSink, read: &mut WsSource) -> SessionResult<bool> {
        let challenge = AuthChallenge::new(self.clock.now_millis(), self.config.auth_expiry);
        let request = challenge.into_request(&self.settings.api_key, &self.settings.api_secret);

        match or_cancelled(&self.cancel, send_request(write, &request)).await {
            Some(sent) => sent?,
            None => return Ok(false),
        }
        info!("[AUTH] Sent (expires {})", challenge.expires_at_ms);

        let reply = match or_cancelled(&self.cancel, next_message(read)).await {
            Some(inbound) => inbound?,
            None => return Ok(false),
        };

        let Inbound::Text(reply) = reply else {
            return Err(SessionError::ClosedDuringAuth);
        };
        info!("[AUTH] Response: {}", reply);

        if is_auth_rejected(&reply) {
            warn!("[AUTH] Auth response not successful, continuing without authentication");
        }
        Ok(true)
    }

    /// Route every inbound message until the server closes the connection
    async fn receive(&self, read: &mut WsSource) -> SessionResult<SessionEnd> {
        loop {
            match next_message(read).await? {
                Inbound::Text(text) => {
                    self.router.handle(&text);
                }
                Inbound::Close(frame) => {
                    info!("[WS] Closed by server: {:?}", frame);
                    return Ok(SessionEnd::ServerClosed);
                }
                Inbound::End => return Err(SessionError::StreamEnded),
            }
        }
    }

    /// Fire-and-forget pings; only a failed send stops this loop
    async fn keep_alive(&self, write: &mut WsSink) -> SessionResult<SessionEnd> {
        let period = self.config.ping_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let req_id = format!(
                "ping-{}-{}",
                self.clock.now().timestamp(),
                PING_SEQ.fetch_add(1, Ordering::Relaxed)
            );
            send_request(write, &WsRequest::ping(req_id.as_str())).await?;
            debug!("[WS] Ping {} sent (session {})", req_id, self.id);
        }
    }

    /// Best-effort close handshake. Errors are swallowed.
    async fn close(&mut self, write: &mut WsSink) {
        self.transition(SessionState::Closing);
        info!("[WS] Closing (session {})", self.id);

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        };
        let handshake = async {
            write.send(Message::Close(Some(frame))).await?;
            write.close().await?;
            Ok::<_, tungstenite::Error>(())
        };

        match tokio::time::timeout(self.config.close_timeout, handshake).await {
            Ok(Ok(())) => debug!("[WS] Close handshake sent"),
            Ok(Err(e)) => debug!("[WS] Close handshake failed: {}", e),
            Err(_) => debug!("[WS] Close handshake timed out"),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// Await `fut` unless the token fires first
async fn or_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

async fn send_request(write: &mut WsSink, request: &WsRequest) -> SessionResult<()> {
    let json = request.to_json()?;
    write.send(Message::Text(json.into())).await?;
    debug!("[WS] Sent {}", request.op());
    Ok(())
}

/// Read the next complete data message.
///
/// Fragmented messages arrive here already reassembled. Transport-level
/// ping/pong frames are skipped.
async fn next_message(read: &mut WsSource) -> SessionResult<Inbound> {
    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => return Ok(Inbound::Text(text.as_str().to_owned())),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => return Ok(Inbound::Text(text.to_owned())),
                Err(_) => warn!("[WS] Dropping non-UTF-8 binary message ({} bytes)", data.len()),
            },
            Message::Close(frame) => return Ok(Inbound::Close(frame)),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
    Ok(Inbound::End)
}
