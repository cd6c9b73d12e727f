//! Bearer tokens issued by the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque access token, optionally with an expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    token: String,
    /// Unix timestamp after which the token is no longer sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// Keep the token itself out of logs.
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of the token attached to outgoing requests.
pub trait TokenProvider: Send + Sync {
    /// The token to send, or `None` for an anonymous request.
    fn bearer_token(&self) -> Option<BearerToken>;
}

impl TokenProvider for Option<BearerToken> {
    fn bearer_token(&self) -> Option<BearerToken> {
        self.clone().filter(|t| !t.is_expired())
    }
}

/// Get current Unix timestamp.
pub(crate) fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
