use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::values::Price;

/// Placeholder for fields the exchange did not send
pub const UNKNOWN: &str = "?";

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UTC_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A single fill reported on the private execution topic.
///
/// Only `exec_id` is guaranteed to carry exchange data. Every other field is
/// best-effort: missing text fields hold [`UNKNOWN`], a missing price is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub exec_id: String,
    pub symbol: String,
    pub side: String,
    pub price: Price,
    /// Executed quantity, kept verbatim as the exchange formats it
    pub qty: String,
    /// Execution time in the process's local zone (`yyyy-MM-dd HH:mm:ss`)
    pub local_time: String,
    /// Execution time as UTC ISO-8601 with millisecond precision
    pub utc_iso: String,
}

impl ExecutionEvent {
    /// Decode one element of a fill `data` array.
    ///
    /// Returns `None` only when `execId` is missing or empty. Any other field
    /// that is absent or malformed falls back to its default.
    pub fn try_parse(fill: &Value) -> Option<Self> {
        let exec_id = field_text(fill, "execId").filter(|id| !id.is_empty())?;

        let symbol = field_text(fill, "symbol").unwrap_or_else(unknown);
        let side = field_text(fill, "side").unwrap_or_else(unknown);
        let qty = field_text(fill, "execQty").unwrap_or_else(unknown);

        let price = field_text(fill, "execPrice")
            .and_then(|raw| parse_decimal(&raw))
            .unwrap_or(Decimal::ZERO);

        let (local_time, utc_iso) = field_text(fill, "execTime")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|ts| {
                (
                    ts.with_timezone(&Local).format(LOCAL_TIME_FORMAT).to_string(),
                    ts.format(UTC_ISO_FORMAT).to_string(),
                )
            })
            .unwrap_or_else(|| (unknown(), unknown()));

        Some(Self {
            exec_id,
            symbol,
            side,
            price,
            qty,
            local_time,
            utc_iso,
        })
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Read a field as text. Numbers are accepted alongside the documented
/// string encoding; any other JSON type counts as absent.
fn field_text(fill: &Value, key: &str) -> Option<String> {
    match fill.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
