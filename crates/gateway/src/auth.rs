//! HMAC-SHA256 authentication for the private stream.
//!
//! The exchange expects the client to sign `GET/realtime{expires}` where
//! `expires` is a unix timestamp in milliseconds a short while in the future.
//! The signature goes out as lowercase hex in the `auth` request.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::messages::WsRequest;

type HmacSha256 = Hmac<Sha256>;

/// How far ahead of "now" an auth challenge expires
pub const AUTH_EXPIRY: Duration = Duration::from_secs(60);

const REALTIME_PREFIX: &str = "GET/realtime";

/// Compute the HMAC-SHA256 of `payload` keyed with `secret`, as lowercase hex.
pub fn sign(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// One authentication attempt's expiry stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthChallenge {
    pub expires_at_ms: i64,
}

impl AuthChallenge {
    /// Challenge expiring `horizon` after `now_ms`
    pub fn new(now_ms: i64, horizon: Duration) -> Self {
        Self {
            expires_at_ms: now_ms
                .saturating_add(i64::try_from(horizon.as_millis()).unwrap_or(i64::MAX)),
        }
    }

    /// The string that gets signed
    pub fn payload(&self) -> String {
        format!("{}{}", REALTIME_PREFIX, self.expires_at_ms)
    }

    /// Build the signed `auth` request
    pub fn into_request(self, api_key: &str, api_secret: &str) -> WsRequest {
        let signature = sign(api_secret, &self.payload());
        WsRequest::auth(api_key, self.expires_at_ms, signature)
    }
}
