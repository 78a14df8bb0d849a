//! execstream Ports
//!
//! Port definitions (traits) for the execution feed.
//! These define the boundaries between the session core and whatever
//! embeds it (time source, event consumer).

mod clock;
mod sink;

pub use clock::Clock;
pub use sink::ExecutionSink;
