use execstream_core::ExecutionEvent;

/// Port for delivering decoded fills
///
/// Called once per fresh (non-duplicate) execution, strictly in receipt
/// order. Implementations must return promptly: the call sits on the
/// receive path of the live connection.
pub trait ExecutionSink: Send + Sync {
    fn emit(&self, event: &ExecutionEvent);
}
