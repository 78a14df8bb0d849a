//! Channel-backed execution sink
//!
//! Hands events to an async consumer without ever blocking the receive path.

use execstream_core::ExecutionEvent;
use execstream_ports::ExecutionSink;
use log::warn;
use tokio::sync::mpsc;

/// Sink that forwards each event into an unbounded tokio channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiver it feeds
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ExecutionSink for ChannelSink {
    fn emit(&self, event: &ExecutionEvent) {
        if self.tx.send(event.clone()).is_err() {
            warn!("Execution receiver dropped, discarding {}", event.exec_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::pair();
        let event = ExecutionEvent::try_parse(&json!({ "execId": "E1" })).unwrap();

        sink.emit(&event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (sink, rx) = ChannelSink::pair();
        drop(rx);

        let event = ExecutionEvent::try_parse(&json!({ "execId": "E1" })).unwrap();
        sink.emit(&event);
    }
}
