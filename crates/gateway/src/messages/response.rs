//! Inbound replies to `op` requests

use serde::Deserialize;

/// Acknowledgement for auth/subscribe/ping
///
/// ```json
/// {"success":true,"ret_msg":"","op":"auth","conn_id":"cejreaspqfh3sjdnldmg-p"}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct OpResponse {
    pub op: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub ret_msg: Option<String>,
    #[serde(default)]
    pub conn_id: Option<String>,
    #[serde(default)]
    pub req_id: Option<String>,
}

impl OpResponse {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// True only when the exchange explicitly reported failure
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}

/// Whether an auth reply reports failure.
///
/// Replies that do not parse as an [`OpResponse`] are scanned for a literal
/// `"success":false` instead.
pub fn is_auth_rejected(raw: &str) -> bool {
    match OpResponse::parse(raw) {
        Some(reply) => reply.is_rejected(),
        None => raw
            .to_ascii_lowercase()
            .replace(char::is_whitespace, "")
            .contains("\"success\":false"),
    }
}
