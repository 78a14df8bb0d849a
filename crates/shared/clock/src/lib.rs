//! execstream Clock Infrastructure
//!
//! Time sources behind the [`Clock`] port:
//!
//! - [`SystemClock`]: wall-clock time, used in production
//! - [`FixedClock`]: frozen time that only moves when told to, used by tests
//!   that need reproducible auth expiries
//!
//! ## Usage
//!
//! ```ignore
//! use execstream_clock::{FixedClock, SystemClock};
//! use chrono::Duration;
//!
//! let live = SystemClock::new();
//! let frozen = FixedClock::at_millis(1_700_000_000_000);
//! frozen.advance(Duration::seconds(20));
//! ```

mod fixed;
mod system;

pub use fixed::FixedClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use execstream_ports::Clock;
