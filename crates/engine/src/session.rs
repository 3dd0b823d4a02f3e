//! Session capability injected by the host application.
//!
//! The engine never authenticates anyone. The host hands it a
//! [`SessionProvider`]; the engine reads the bearer token when talking to the
//! remote and calls [`SessionProvider::invalidate`] when the remote rejects
//! that token, after which it keeps working against local storage only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;

/// Read-only view of the host application's auth session.
pub trait SessionProvider: Send + Sync {
    /// Whether a user is currently signed in.
    fn is_active(&self) -> bool;

    /// Bearer token for remote calls, if a session exists.
    fn access_token(&self) -> Option<SecretString>;

    /// Drop the session after the remote rejected its token.
    fn invalidate(&self);
}

#[derive(Debug, Default)]
struct SessionHandleInner {
    active: AtomicBool,
    token: Mutex<Option<SecretString>>,
}

/// Shareable [`SessionProvider`] for hosts without their own session
/// machinery, and for tests. Clones share one underlying session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<SessionHandleInner>,
}

impl SessionHandle {
    /// A handle with no signed-in user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A handle already signed in with the given token.
    #[must_use]
    pub fn signed_in(token: impl Into<String>) -> Self {
        let handle = Self::default();
        handle.sign_in(token);
        handle
    }

    /// Mark the session active with a fresh token.
    pub fn sign_in(&self, token: impl Into<String>) {
        *self.lock_token() = Some(SecretString::from(token.into()));
        self.inner.active.store(true, Ordering::SeqCst);
    }

    /// Clear the session.
    pub fn sign_out(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        *self.lock_token() = None;
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<SecretString>> {
        self.inner
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionProvider for SessionHandle {
    fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    fn access_token(&self) -> Option<SecretString> {
        self.lock_token().clone()
    }

    fn invalidate(&self) {
        self.sign_out();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_anonymous_has_no_token() {
        let session = SessionHandle::anonymous();

        assert!(!session.is_active());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_sign_in_exposes_token() {
        let session = SessionHandle::anonymous();
        session.sign_in("tok-123");

        assert!(session.is_active());
        let token = session.access_token().unwrap();
        assert_eq!(token.expose_secret(), "tok-123");
    }

    #[test]
    fn test_sign_out_clears_session() {
        let session = SessionHandle::signed_in("tok-123");
        session.sign_out();

        assert!(!session.is_active());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_invalidate_behaves_like_sign_out() {
        let session = SessionHandle::signed_in("tok-123");
        let provider: &dyn SessionProvider = &session;
        provider.invalidate();

        assert!(!session.is_active());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionHandle::anonymous();
        let clone = session.clone();

        session.sign_in("tok-123");

        assert!(clone.is_active());
        assert_eq!(clone.access_token().unwrap().expose_secret(), "tok-123");
    }
}
