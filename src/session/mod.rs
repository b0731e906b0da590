//! The session core: one authoritative in-memory view of "is someone
//! logged in, and as whom."
//!
//! - [`SessionState`] — the consumer-visible triple (identity, session,
//!   loading), only ever constructed through its invariant-preserving
//!   constructors
//! - [`SessionSynchronizer`] — initial fetch, ordered auth-event loop,
//!   command operations, detached profile reconciliation, idempotent
//!   teardown
//! - [`SessionContext`] — install-once handle the UI layers resolve the
//!   synchronizer through; resolving an empty context is a wiring defect
//!   and fails fast

mod context;
mod synchronizer;

pub use context::SessionContext;
pub use synchronizer::SessionSynchronizer;

use serde::Serialize;

use crate::identity::{Identity, Session};

/// Consumer-visible authentication state.
///
/// Invariants, held for every reachable value:
/// - `identity` is `Some` exactly when `session` is `Some`
/// - `loading` is `true` only before the first resolution of the initial
///   session fetch, and never becomes `true` again
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Authenticated user, derived from the session payload.
    pub identity: Option<Identity>,
    /// Most recently observed credential.
    pub session: Option<Session>,
    /// Still waiting on the initial session fetch.
    pub loading: bool,
}

impl SessionState {
    /// State before the initial fetch has resolved.
    pub(crate) fn booting() -> Self {
        Self {
            identity: None,
            session: None,
            loading: true,
        }
    }

    /// Authenticated state for a session; the identity is derived from it.
    pub fn authenticated(session: Session) -> Self {
        Self {
            identity: Some(session.user.clone()),
            session: Some(session),
            loading: false,
        }
    }

    /// Resolved, unauthenticated state.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            session: None,
            loading: false,
        }
    }

    /// Whether a session is currently active.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session(id: &str, email: &str) -> Session {
        Session {
            access_token: format!("access-{id}"),
            refresh_token: format!("refresh-{id}"),
            expires_at: Some(1_900_000_000),
            user: Identity {
                id: id.into(),
                email: email.into(),
                display_name: None,
                avatar_url: None,
                provider: Some("email".into()),
            },
        }
    }

    #[test]
    fn authenticated_holds_identity_session_invariant() {
        let state = SessionState::authenticated(test_session("u1", "alice@example.com"));
        assert!(state.identity.is_some());
        assert!(state.session.is_some());
        assert!(!state.loading);
        assert!(state.is_authenticated());
        assert_eq!(state.identity.unwrap().id, "u1");
    }

    #[test]
    fn anonymous_holds_identity_session_invariant() {
        let state = SessionState::anonymous();
        assert!(state.identity.is_none());
        assert!(state.session.is_none());
        assert!(!state.loading);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn booting_is_unauthenticated_and_loading() {
        let state = SessionState::booting();
        assert!(state.identity.is_none());
        assert!(state.session.is_none());
        assert!(state.loading);
    }
}
