//! Console output for executions

use execstream_core::ExecutionEvent;
use execstream_ports::ExecutionSink;
use parking_lot::Mutex;
use std::io::Write;

/// One line per execution
pub fn format_execution(event: &ExecutionEvent) -> String {
    format!(
        "[{}] Execution ID: {}, Symbol: {}, Side: {}, Price: {:.2}, Qty: {}, Time: {}",
        event.local_time,
        event.exec_id,
        event.symbol,
        event.side,
        event.price,
        event.qty,
        event.utc_iso
    )
}

/// Writes formatted executions to any `Write`; stdout by default
pub struct ConsoleSink<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ExecutionSink for ConsoleSink<W> {
    fn emit(&self, event: &ExecutionEvent) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", format_execution(event)).and_then(|_| out.flush()) {
            log::warn!("[EXEC] Failed to write execution {}: {}", event.exec_id, e);
        }
    }
}
