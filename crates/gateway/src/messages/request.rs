//! Outbound request messages

use serde::Serialize;

/// Requests sent to the private stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WsRequest {
    /// `[api_key, expires_at_ms, signature_hex]`
    Auth { args: (String, i64, String) },
    Subscribe { args: Vec<String> },
    /// Keep-alive. The reply is never correlated back to the request.
    Ping { req_id: String },
}

impl WsRequest {
    pub fn auth(api_key: impl Into<String>, expires_at_ms: i64, signature: String) -> Self {
        WsRequest::Auth {
            args: (api_key.into(), expires_at_ms, signature),
        }
    }

    pub fn subscribe(topics: Vec<String>) -> Self {
        WsRequest::Subscribe { args: topics }
    }

    pub fn ping(req_id: impl Into<String>) -> Self {
        WsRequest::Ping {
            req_id: req_id.into(),
        }
    }

    /// Short name for log lines
    pub fn op(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Subscribe { .. } => "subscribe",
            Self::Ping { .. } => "ping",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_auth_serialization() {
        let req = WsRequest::auth("key", 1_700_000_000_000, "abcd".to_string());
        let value: Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "op": "auth", "args": ["key", 1_700_000_000_000i64, "abcd"] })
        );
    }

    #[test]
    fn test_subscribe_serialization() {
        let req = WsRequest::subscribe(vec![
            "execution.fast.linear".to_string(),
            "order".to_string(),
        ]);
        let value: Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "op": "subscribe", "args": ["execution.fast.linear", "order"] })
        );
    }

    #[test]
    fn test_ping_serialization() {
        let req = WsRequest::ping("ping-1700000000-1");
        let value: Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "op": "ping", "req_id": "ping-1700000000-1" }));
        assert_eq!(req.op(), "ping");
    }
}
