//! execstream Core Domain
//!
//! Pure domain types for the execution feed.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod dedup;
pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use dedup::{DEFAULT_CAPACITY, DedupCache};
pub use entities::{ExecutionEvent, Settings, SettingsError, UNKNOWN};
pub use values::{Price, Timestamp};
