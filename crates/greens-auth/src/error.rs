//! Authentication errors.

use crate::forms::FieldErrors;
use crate::user::Role;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No user is logged in.
    #[error("not logged in")]
    NotAuthenticated,

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// The user lacks the role an action needs.
    #[error("insufficient permissions: requires {0}")]
    InsufficientPermissions(Role),

    /// A submitted form failed validation.
    #[error("{0}")]
    Validation(#[from] FieldErrors),
}

impl AuthError {
    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AuthError::NotAuthenticated | AuthError::TokenExpired)
    }

    /// Check if this is a permission error.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, AuthError::InsufficientPermissions(_))
    }
}
