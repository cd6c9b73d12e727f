//! Gateway errors.

use thiserror::Error;

/// Error type for backend calls.
///
/// The backend's error bodies are not parsed, so everything except a 401
/// collapses into `RequestFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The backend rejected our token; the session has been logged out.
    #[error("Unauthorized: please log in again")]
    Unauthorized,
}

impl GatewayError {
    pub fn request_failed(reason: impl Into<String>) -> Self {
        GatewayError::RequestFailed(reason.into())
    }
}

impl From<greens_commerce::CommerceError> for GatewayError {
    fn from(e: greens_commerce::CommerceError) -> Self {
        GatewayError::RequestFailed(format!("invalid payload: {e}"))
    }
}
