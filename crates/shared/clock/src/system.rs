use chrono::Utc;
use execstream_core::Timestamp;
use execstream_ports::Clock;

/// Wall-clock time source used by live sessions
///
/// Auth challenges must expire relative to the exchange's notion of now,
/// and ping ids carry the current unix second, so a live session reads the
/// host clock directly.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::thread;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let time1 = clock.now();
        thread::sleep(std::time::Duration::from_millis(10));
        let time2 = clock.now();

        assert!(time2 > time1);
        let diff = time2 - time1;
        assert!(diff >= Duration::milliseconds(9));
    }

    #[test]
    fn test_now_millis_matches_now() {
        let clock = SystemClock::new();
        let before = Utc::now().timestamp_millis();
        let millis = clock.now_millis();
        let after = Utc::now().timestamp_millis();

        assert!(millis >= before && millis <= after);
    }
}
