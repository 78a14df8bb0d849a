use execstream_core::Timestamp;

/// Port for time abstraction
///
/// This allows the system to use different time sources:
/// - Real system time for production
/// - Fixed time for deterministic tests
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Current time as milliseconds since the unix epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}
