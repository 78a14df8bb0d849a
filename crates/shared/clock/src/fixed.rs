use chrono::{DateTime, Duration, Utc};
use execstream_core::Timestamp;
use execstream_ports::Clock;
use parking_lot::RwLock;

/// Frozen clock for deterministic tests
///
/// Time stands still until [`FixedClock::advance`] or [`FixedClock::set`]
/// is called.
pub struct FixedClock {
    time: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(time: Timestamp) -> Self {
        Self {
            time: RwLock::new(time),
        }
    }

    /// Clock frozen at a unix timestamp in milliseconds.
    /// Out-of-range values fall back to the unix epoch.
    pub fn at_millis(millis: i64) -> Self {
        Self::new(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn set(&self, time: Timestamp) {
        *self.time.write() = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut time = self.time.write();
        *time += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.time.read()
    }
}
