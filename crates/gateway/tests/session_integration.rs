//! Session integration tests
//!
//! Runs the supervisor and session against a scripted WebSocket server on
//! localhost. Each accepted connection gets its own handler with the
//! connection index, so tests can script reconnect behaviour.

use execstream_clock::{FixedClock, SystemClock};
use execstream_core::{DedupCache, ExecutionEvent, Settings};
use execstream_gateway::{
    ChannelSink, ConnectionSession, MessageRouter, SessionConfig, SessionEnd, SessionState,
    SessionSupervisor, sign,
};
use execstream_ports::Clock;
use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async};

type ServerWs = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Test Fixtures
// ============================================================================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Start a scripted server and return its address
async fn start_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(usize, ServerWs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut index = 0;
        while let Ok((stream, _)) = listener.accept().await {
            let Ok(ws) = accept_async(stream).await else {
                continue;
            };
            tokio::spawn(handler(index, ws));
            index += 1;
        }
    });

    addr
}

/// Next text frame from the client, parsed as JSON
async fn next_json(ws: &mut ServerWs) -> Option<Value> {
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Answer auth and subscribe successfully, returning both requests
async fn handshake(ws: &mut ServerWs) -> (Value, Value) {
    let auth = next_json(ws).await.expect("auth request");
    send_json(ws, json!({ "success": true, "ret_msg": "", "op": "auth", "conn_id": "c1" })).await;

    let subscribe = next_json(ws).await.expect("subscribe request");
    send_json(ws, json!({ "success": true, "ret_msg": "", "op": "subscribe", "conn_id": "c1" }))
        .await;

    (auth, subscribe)
}

/// Park until the client closes or drops the connection
async fn drain(ws: &mut ServerWs) {
    while next_json(ws).await.is_some() {}
}

fn fill(exec_id: &str) -> Value {
    json!({
        "execId": exec_id,
        "symbol": "BTCUSDT",
        "side": "Buy",
        "execQty": "0.5",
        "execPrice": "65000.12",
        "execTime": "1700000000000"
    })
}

fn execution_frame(ids: &[&str]) -> Value {
    json!({
        "topic": "execution.fast.linear",
        "creationTime": 1700000000000i64,
        "data": ids.iter().map(|id| fill(id)).collect::<Vec<_>>()
    })
}

fn fast_config() -> SessionConfig {
    SessionConfig::default().with_reconnect_delay(Duration::from_millis(20))
}

fn supervisor(
    addr: SocketAddr,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
) -> (Arc<SessionSupervisor>, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sink, rx) = ChannelSink::pair();
    let router = MessageRouter::new(Arc::new(DedupCache::new()), Arc::new(sink));
    let settings = Settings::new(format!("ws://{}/v5/private", addr), "key", "secret");
    let supervisor = SessionSupervisor::new(settings, config, router, clock);
    (Arc::new(supervisor), rx)
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<ExecutionEvent>) -> ExecutionEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for execution")
        .expect("execution channel closed")
}

// ============================================================================
// Streaming Tests
// ============================================================================

#[tokio::test]
async fn test_executions_delivered_in_order_without_duplicates() {
    init_logging();
    let (requests_tx, mut requests_rx) = mpsc::unbounded_channel();

    let addr = start_server(move |_, mut ws| {
        let requests_tx = requests_tx.clone();
        async move {
            let (auth, subscribe) = handshake(&mut ws).await;
            requests_tx.send(auth).unwrap();
            requests_tx.send(subscribe).unwrap();

            send_json(&mut ws, execution_frame(&["E1", "E2"])).await;
            send_json(&mut ws, json!({ "op": "pong", "success": true })).await;
            send_json(&mut ws, json!({ "topic": "order", "data": [fill("O1")] })).await;
            send_json(&mut ws, execution_frame(&["E2"])).await;
            let binary = execution_frame(&["E3"]).to_string().into_bytes();
            ws.send(Message::Binary(binary.into())).await.unwrap();
            drain(&mut ws).await;
        }
    })
    .await;

    let clock = Arc::new(FixedClock::at_millis(1_699_999_940_000));
    let (supervisor, mut rx) = supervisor(addr, fast_config(), clock);
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    let first = recv(&mut rx).await;
    assert_eq!(first.exec_id, "E1");
    assert_eq!(first.symbol, "BTCUSDT");
    assert_eq!(first.side, "Buy");
    assert_eq!(first.price, dec!(65000.12));
    assert_eq!(first.qty, "0.5");
    assert_eq!(first.utc_iso, "2023-11-14T22:13:20.000Z");
    assert_eq!(recv(&mut rx).await.exec_id, "E2");
    assert_eq!(recv(&mut rx).await.exec_id, "E3");

    let auth = requests_rx.recv().await.unwrap();
    assert_eq!(auth["op"], "auth");
    assert_eq!(auth["args"][0], "key");
    assert_eq!(auth["args"][1], 1_700_000_000_000i64);
    assert_eq!(
        auth["args"][2],
        sign("secret", "GET/realtime1700000000000").as_str()
    );

    let subscribe = requests_rx.recv().await.unwrap();
    assert_eq!(subscribe, json!({ "op": "subscribe", "args": ["execution.fast.linear"] }));

    supervisor.stop();
    let report = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(report.failures, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_dedup_survives_reconnect() {
    init_logging();

    let addr = start_server(|index, mut ws| async move {
        handshake(&mut ws).await;
        if index == 0 {
            send_json(&mut ws, execution_frame(&["E1"])).await;
            // Abrupt drop, no close handshake
            drop(ws);
        } else {
            send_json(&mut ws, execution_frame(&["E1", "E2"])).await;
            drain(&mut ws).await;
        }
    })
    .await;

    let (supervisor, mut rx) = supervisor(addr, fast_config(), Arc::new(SystemClock::new()));
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    assert_eq!(recv(&mut rx).await.exec_id, "E1");
    assert_eq!(recv(&mut rx).await.exec_id, "E2");
    assert!(supervisor.attempts() >= 2);
    assert!(supervisor.router().dedup().contains("E1"));

    supervisor.stop();
    let report = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(report.failures >= 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_auth_rejection_still_subscribes() {
    init_logging();

    let addr = start_server(|_, mut ws| async move {
        next_json(&mut ws).await.expect("auth request");
        send_json(
            &mut ws,
            json!({ "success": false, "ret_msg": "error sign", "op": "auth" }),
        )
        .await;

        let subscribe = next_json(&mut ws).await.expect("subscribe request");
        assert_eq!(subscribe["op"], "subscribe");
        send_json(&mut ws, execution_frame(&["E7"])).await;
        drain(&mut ws).await;
    })
    .await;

    let (supervisor, mut rx) = supervisor(addr, fast_config(), Arc::new(SystemClock::new()));
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    assert_eq!(recv(&mut rx).await.exec_id, "E7");

    supervisor.stop();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_server_close_during_auth_reconnects() {
    init_logging();

    let addr = start_server(|index, mut ws| async move {
        if index == 0 {
            next_json(&mut ws).await.expect("auth request");
            let _ = ws.close(None).await;
            return;
        }
        handshake(&mut ws).await;
        send_json(&mut ws, execution_frame(&["E5"])).await;
        drain(&mut ws).await;
    })
    .await;

    let (supervisor, mut rx) = supervisor(addr, fast_config(), Arc::new(SystemClock::new()));
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    assert_eq!(recv(&mut rx).await.exec_id, "E5");

    supervisor.stop();
    let report = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(report.attempts >= 2);
    assert!(report.failures >= 1);
}

// ============================================================================
// Keep-alive and Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_keep_alive_pings() {
    init_logging();
    let (pings_tx, mut pings_rx) = mpsc::unbounded_channel();

    let addr = start_server(move |_, mut ws| {
        let pings_tx = pings_tx.clone();
        async move {
            handshake(&mut ws).await;
            while let Some(msg) = next_json(&mut ws).await {
                let _ = pings_tx.send(msg);
            }
        }
    })
    .await;

    let config = fast_config().with_ping_interval(Duration::from_millis(50));
    let (supervisor, _rx) = supervisor(addr, config, Arc::new(SystemClock::new()));
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    let first = tokio::time::timeout(WAIT, pings_rx.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(WAIT, pings_rx.recv()).await.unwrap().unwrap();

    for ping in [&first, &second] {
        assert_eq!(ping["op"], "ping");
        assert!(ping["req_id"].as_str().unwrap().starts_with("ping-"));
    }
    assert_ne!(first["req_id"], second["req_id"]);

    supervisor.stop();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancellation_sends_normal_close() {
    init_logging();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let addr = start_server(move |_, mut ws| {
        let events_tx = events_tx.clone();
        async move {
            handshake(&mut ws).await;
            events_tx.send("subscribed".to_string()).unwrap();

            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(Some(frame)) = msg {
                    assert_eq!(frame.code, CloseCode::Normal);
                    events_tx.send(frame.reason.as_str().to_owned()).unwrap();
                    break;
                }
            }
        }
    })
    .await;

    let (supervisor, _rx) = supervisor(addr, fast_config(), Arc::new(SystemClock::new()));
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    let subscribed = tokio::time::timeout(WAIT, events_rx.recv()).await.unwrap();
    assert_eq!(subscribed.as_deref(), Some("subscribed"));

    supervisor.stop();
    let report = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(report.failures, 0);

    let reason = tokio::time::timeout(WAIT, events_rx.recv()).await.unwrap();
    assert_eq!(reason.as_deref(), Some("bye"));
}

#[tokio::test]
async fn test_session_ends_on_server_close() {
    init_logging();

    let addr = start_server(|_, mut ws| async move {
        handshake(&mut ws).await;
        send_json(&mut ws, execution_frame(&["E1"])).await;
        let _ = ws.close(None).await;
    })
    .await;

    let (sink, mut rx) = ChannelSink::pair();
    let router = MessageRouter::new(Arc::new(DedupCache::new()), Arc::new(sink));
    let settings = Settings::new(format!("ws://{}/v5/private", addr), "key", "secret");
    let config = SessionConfig::default();
    let clock = SystemClock::new();

    let mut session = ConnectionSession::new(
        &settings,
        &config,
        &router,
        &clock,
        tokio_util::sync::CancellationToken::new(),
    );
    let end = tokio::time::timeout(WAIT, session.run()).await.unwrap().unwrap();

    assert_eq!(end, SessionEnd::ServerClosed);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(recv(&mut rx).await.exec_id, "E1");
}

#[tokio::test]
async fn test_reconnect_waits_for_backoff() {
    init_logging();
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();

    let addr = start_server(move |index, mut ws| {
        let accepted_tx = accepted_tx.clone();
        async move {
            accepted_tx.send(std::time::Instant::now()).unwrap();
            if index == 0 {
                next_json(&mut ws).await.expect("auth request");
                drop(ws);
                return;
            }
            handshake(&mut ws).await;
            drain(&mut ws).await;
        }
    })
    .await;

    let config = SessionConfig::default().with_reconnect_delay(Duration::from_millis(400));
    let (supervisor, _rx) = supervisor(addr, config, Arc::new(SystemClock::new()));
    let handle = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    let first = tokio::time::timeout(WAIT, accepted_rx.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(WAIT, accepted_rx.recv()).await.unwrap().unwrap();
    assert!(second.duration_since(first) >= Duration::from_millis(400));

    supervisor.stop();
    let report = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert_eq!(report.attempts, 2);
    assert_eq!(report.failures, 1);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_auth_reply() {
    init_logging();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // Reads the auth request and never answers it
    let addr = start_server(move |_, mut ws| {
        let events_tx = events_tx.clone();
        async move {
            let auth = next_json(&mut ws).await.expect("auth request");
            events_tx.send(auth["op"].as_str().unwrap_or_default().to_owned()).unwrap();

            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(Some(frame)) = msg {
                    assert_eq!(frame.code, CloseCode::Normal);
                    events_tx.send(frame.reason.as_str().to_owned()).unwrap();
                    break;
                }
            }
        }
    })
    .await;

    let (sink, _rx) = ChannelSink::pair();
    let router = MessageRouter::new(Arc::new(DedupCache::new()), Arc::new(sink));
    let settings = Settings::new(format!("ws://{}/v5/private", addr), "key", "secret");
    let config = SessionConfig::default();
    let clock = SystemClock::new();
    let cancel = tokio_util::sync::CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        }
    });

    let mut session = ConnectionSession::new(&settings, &config, &router, &clock, cancel);
    let end = tokio::time::timeout(WAIT, session.run()).await.unwrap().unwrap();

    assert_eq!(end, SessionEnd::Cancelled);
    assert_eq!(session.state(), SessionState::Closed);

    let auth = tokio::time::timeout(WAIT, events_rx.recv()).await.unwrap();
    assert_eq!(auth.as_deref(), Some("auth"));
    let reason = tokio::time::timeout(WAIT, events_rx.recv()).await.unwrap();
    assert_eq!(reason.as_deref(), Some("bye"));
}

#[tokio::test]
async fn test_cancel_while_connecting() {
    init_logging();

    // Accepts TCP but never completes the WebSocket upgrade
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let (sink, _rx) = ChannelSink::pair();
    let router = MessageRouter::new(Arc::new(DedupCache::new()), Arc::new(sink));
    let settings = Settings::new(format!("ws://{}/v5/private", addr), "key", "secret");
    let config = SessionConfig::default();
    let clock = SystemClock::new();
    let cancel = tokio_util::sync::CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        }
    });

    let mut session = ConnectionSession::new(&settings, &config, &router, &clock, cancel);
    let end = tokio::time::timeout(WAIT, session.run()).await.unwrap().unwrap();

    assert_eq!(end, SessionEnd::Cancelled);
    assert_eq!(session.state(), SessionState::Closed);
}
