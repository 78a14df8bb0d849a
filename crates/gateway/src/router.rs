//! Inbound frame classification and fill dispatch
//!
//! Every complete message read from the private stream goes through
//! [`MessageRouter::handle`], one at a time and in receipt order. Only
//! execution pushes produce output; everything else is logged and dropped.

use execstream_core::{DedupCache, ExecutionEvent};
use execstream_ports::ExecutionSink;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::messages::OpResponse;

const EXECUTION_TOPIC_PREFIX: &str = "execution";

/// What a single inbound frame turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Acknowledgement of auth/subscribe/ping
    Control,
    /// System message or a topic other than executions
    NonExecutionTopic,
    /// Execution push; counts describe what happened to each fill
    ExecutionData {
        emitted: usize,
        duplicates: usize,
        rejected: usize,
    },
    /// Not JSON, not an object, or an execution push without a `data` array
    Malformed,
}

/// Routes frames to the decoder, dedup cache and output sink
#[derive(Clone)]
pub struct MessageRouter {
    dedup: Arc<DedupCache>,
    sink: Arc<dyn ExecutionSink>,
}

impl MessageRouter {
    pub fn new(dedup: Arc<DedupCache>, sink: Arc<dyn ExecutionSink>) -> Self {
        Self { dedup, sink }
    }

    pub fn dedup(&self) -> &Arc<DedupCache> {
        &self.dedup
    }

    /// Classify one frame and emit any fresh fills it carries.
    ///
    /// Never fails: malformed input is logged and reported as
    /// [`FrameKind::Malformed`].
    pub fn handle(&self, raw: &str) -> FrameKind {
        let root: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("[HANDLE] Unparsable frame ({}): {}", e, raw);
                return FrameKind::Malformed;
            }
        };

        let Some(fields) = root.as_object() else {
            warn!("[HANDLE] Frame is not a JSON object: {}", raw);
            return FrameKind::Malformed;
        };

        if fields.contains_key("op") {
            self.log_control(raw);
            return FrameKind::Control;
        }

        let Some(topic) = fields.get("topic") else {
            info!("[SYS] {}", raw);
            return FrameKind::NonExecutionTopic;
        };

        let topic = topic.as_str().unwrap_or_default();
        if !is_execution_topic(topic) {
            debug!("[MSG] {}", raw);
            return FrameKind::NonExecutionTopic;
        }

        let Some(fills) = fields.get("data").and_then(Value::as_array) else {
            warn!("[EXEC] Execution push without data array: {}", raw);
            return FrameKind::Malformed;
        };

        self.dispatch_fills(topic, fills)
    }

    fn dispatch_fills(&self, topic: &str, fills: &[Value]) -> FrameKind {
        let mut emitted = 0;
        let mut duplicates = 0;
        let mut rejected = 0;

        for fill in fills {
            let Some(event) = ExecutionEvent::try_parse(fill) else {
                debug!("Skipping fill without execId on {}: {}", topic, fill);
                rejected += 1;
                continue;
            };

            if self.dedup.is_duplicate(&event.exec_id) {
                debug!("Duplicate execution {} suppressed", event.exec_id);
                duplicates += 1;
                continue;
            }

            self.sink.emit(&event);
            emitted += 1;
        }

        FrameKind::ExecutionData {
            emitted,
            duplicates,
            rejected,
        }
    }

    fn log_control(&self, raw: &str) {
        match OpResponse::parse(raw) {
            Some(reply) if reply.is_rejected() => warn!(
                "[CTRL] {} rejected: {}",
                reply.op,
                reply.ret_msg.as_deref().unwrap_or_default()
            ),
            _ => debug!("[CTRL] {}", raw),
        }
    }
}

/// Case-insensitive `execution` prefix check
fn is_execution_topic(topic: &str) -> bool {
    topic
        .get(..EXECUTION_TOPIC_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(EXECUTION_TOPIC_PREFIX))
}
