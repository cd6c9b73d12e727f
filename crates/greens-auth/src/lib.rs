//! Authentication state for the storefront client.
//!
//! The backend owns credentials and issues opaque bearer tokens. This crate
//! keeps the current user and token in an explicitly passed [`AuthSession`],
//! exposes the token to the HTTP layer through [`TokenProvider`], and turns a
//! rejected token into a logout through [`UnauthorizedHook`]. It also holds the
//! login, registration and profile form validators.

mod error;
mod forms;
mod session;
mod token;
mod user;

pub use error::AuthError;
pub use forms::{
    Credentials, FieldErrors, LoginForm, ProfileForm, ProfileUpdate, RegisterForm, Registration,
    Validate, VoucherForm,
};
pub use session::{AuthSession, LogoutReason, UnauthorizedHook};
pub use token::{BearerToken, TokenProvider};
pub use user::{Role, User};
