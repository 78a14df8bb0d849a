use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
