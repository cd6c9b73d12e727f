//! Session management.
//!
//! One [`AuthSession`] exists per client and is passed explicitly (usually as
//! `Arc<AuthSession>`) to whatever needs the current user or token.

use std::sync::{Mutex, MutexGuard, RwLock};

use crate::token::{current_timestamp, BearerToken, TokenProvider};
use crate::user::{Role, User};
use crate::AuthError;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// The backend rejected the token with a 401.
    Unauthorized,
    /// The token passed its expiry.
    Expired,
}

/// Called by the HTTP layer when the backend answers 401.
pub trait UnauthorizedHook: Send + Sync {
    fn on_unauthorized(&self);
}

type LogoutListener = Box<dyn Fn(LogoutReason) + Send + Sync>;

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    token: Option<BearerToken>,
    logged_in_at: Option<i64>,
}

/// The client's authentication state.
#[derive(Default)]
pub struct AuthSession {
    state: RwLock<SessionState>,
    listeners: Mutex<Vec<LogoutListener>>,
}

impl AuthSession {
    /// Create an anonymous session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the user and token returned by a successful login.
    pub fn login(&self, user: User, token: BearerToken) {
        tracing::info!(user = %user.id, role = %user.role, "session logged in");
        let mut state = self.write();
        state.user = Some(user);
        state.token = Some(token);
        state.logged_in_at = Some(current_timestamp());
    }

    /// Use a token without a known user profile (e.g. from the environment).
    pub fn set_token(&self, token: BearerToken) {
        let mut state = self.write();
        state.token = Some(token);
        state.logged_in_at.get_or_insert_with(current_timestamp);
    }

    /// Drop user and token and notify logout listeners.
    ///
    /// Logging out an anonymous session is a no-op and notifies nobody.
    pub fn logout(&self, reason: LogoutReason) {
        {
            let mut state = self.write();
            if state.token.is_none() && state.user.is_none() {
                return;
            }
            *state = SessionState::default();
        }
        tracing::info!(?reason, "session logged out");

        // Listeners run unlocked so they may register listeners or log out again.
        let listeners = std::mem::take(&mut *self.listeners());
        for listener in &listeners {
            listener(reason);
        }
        let mut slot = self.listeners();
        let added = std::mem::replace(&mut *slot, listeners);
        slot.extend(added);
    }

    /// Register a callback run after every logout (e.g. to clear the cart).
    pub fn on_logout(&self, listener: impl Fn(LogoutReason) + Send + Sync + 'static) {
        self.listeners().push(Box::new(listener));
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    /// The logged-in user, if the backend told us who it is.
    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn logged_in_at(&self) -> Option<i64> {
        self.read().logged_in_at
    }

    /// Replace the stored user after a profile edit.
    pub fn update_user(&self, update: impl FnOnce(&mut User)) -> Result<User, AuthError> {
        let mut state = self.write();
        let user = state.user.as_mut().ok_or(AuthError::NotAuthenticated)?;
        update(user);
        Ok(user.clone())
    }

    /// The logged-in user if they hold at least `role`.
    pub fn require_role(&self, role: Role) -> Result<User, AuthError> {
        let state = self.read();
        if state.token.as_ref().is_some_and(BearerToken::is_expired) {
            return Err(AuthError::TokenExpired);
        }
        let user = state.user.as_ref().ok_or(AuthError::NotAuthenticated)?;
        if !user.has_permission(role) {
            return Err(AuthError::InsufficientPermissions(role));
        }
        Ok(user.clone())
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<LogoutListener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

impl TokenProvider for AuthSession {
    fn bearer_token(&self) -> Option<BearerToken> {
        let token = self.read().token.clone()?;
        if token.is_expired() {
            self.logout(LogoutReason::Expired);
            return None;
        }
        Some(token)
    }
}

impl UnauthorizedHook for AuthSession {
    fn on_unauthorized(&self) {
        self.logout(LogoutReason::Unauthorized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn seller() -> User {
        User::new("u1", "Asha", "asha@greens.test", Role::Seller)
    }

    #[test]
    fn test_anonymous_session() {
        let session = AuthSession::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.bearer_token(), None);
        assert_eq!(session.require_role(Role::Buyer), Err(AuthError::NotAuthenticated));
    }

    #[test]
    fn test_login_exposes_token() {
        let session = AuthSession::new();
        session.login(seller(), BearerToken::new("t1"));
        assert!(session.is_authenticated());
        assert_eq!(session.bearer_token().unwrap().as_str(), "t1");
        assert!(session.logged_in_at().is_some());
    }

    #[test]
    fn test_unauthorized_logs_out_and_notifies() {
        let session = AuthSession::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        session.on_logout(move |reason| {
            assert_eq!(reason, LogoutReason::Unauthorized);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        session.login(seller(), BearerToken::new("t1"));
        session.on_unauthorized();

        assert!(!session.is_authenticated());
        assert_eq!(session.user(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Already anonymous: no second notification
        session.on_unauthorized();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_reenter_session() {
        let session = Arc::new(AuthSession::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&session);
        let seen = calls.clone();
        session.on_logout(move |reason| {
            let Some(session) = weak.upgrade() else { return };
            // Nested logout on an already anonymous session is a no-op.
            session.logout(reason);
            let seen = seen.clone();
            session.on_logout(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        });

        session.login(seller(), BearerToken::new("t1"));
        session.logout(LogoutReason::UserRequested);
        assert!(!session.is_authenticated());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The listener registered during the first logout runs on the next one.
        session.login(seller(), BearerToken::new("t2"));
        session.logout(LogoutReason::UserRequested);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expired_token_is_not_sent() {
        let session = AuthSession::new();
        session.login(seller(), BearerToken::new("t1").with_expiry(1));
        assert_eq!(session.bearer_token(), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_require_role() {
        let session = AuthSession::new();
        session.login(
            User::new("u2", "Ben", "ben@greens.test", Role::Buyer),
            BearerToken::new("t2"),
        );
        assert_eq!(
            session.require_role(Role::Seller),
            Err(AuthError::InsufficientPermissions(Role::Seller))
        );

        session.login(seller(), BearerToken::new("t1"));
        assert_eq!(session.require_role(Role::Seller).unwrap().name, "Asha");
    }

    #[test]
    fn test_token_only_session() {
        let session = AuthSession::new();
        session.set_token(BearerToken::new("env-token"));
        assert!(session.is_authenticated());
        assert_eq!(session.user(), None);
        assert!(session.update_user(|u| u.name.clear()).is_err());
    }
}
