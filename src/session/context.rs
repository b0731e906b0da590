//! Install-once handle the UI layers resolve the synchronizer through.
//!
//! The synchronizer is constructed exactly once at application startup
//! and shared from there. Resolving a context nobody installed into is
//! not a runtime condition to recover from — it means the application
//! was wired wrong, and it fails immediately and loudly.

use std::sync::{Arc, OnceLock};

use crate::session::SessionSynchronizer;

/// Shared slot for the application's one [`SessionSynchronizer`].
///
/// Cheap to clone; all clones resolve to the same installed instance.
#[derive(Clone, Default)]
pub struct SessionContext {
    slot: Arc<OnceLock<Arc<SessionSynchronizer>>>,
}

impl SessionContext {
    /// Empty context. Hand clones to every consumer, then [`install`]
    /// (`Self::install`) the synchronizer during startup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the synchronizer. Panics on a second install: two
    /// synchronizers means two competing session owners, which is a
    /// wiring defect.
    pub fn install(&self, synchronizer: Arc<SessionSynchronizer>) {
        if self.slot.set(synchronizer).is_err() {
            panic!("SessionContext::install called twice — the session synchronizer must be constructed exactly once per application");
        }
    }

    /// Resolve the installed synchronizer.
    ///
    /// Panics if nothing was installed: a consumer ran outside an active
    /// synchronizer context, which is a wiring defect, not a runtime
    /// error.
    pub fn handle(&self) -> Arc<SessionSynchronizer> {
        self.slot
            .get()
            .cloned()
            .expect(
                "SessionContext used before a synchronizer was installed — construct the synchronizer during application startup and install it before any consumer runs",
            )
    }

    /// Non-panicking lookup, for code that can meaningfully run before
    /// startup completes.
    pub fn try_handle(&self) -> Option<Arc<SessionSynchronizer>> {
        self.slot.get().cloned()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{
        AuthError, AuthEventBus, AuthProvider, EventSubscription, IdentityService, Session,
    };
    use crate::notify::NotificationHub;
    use crate::profile::{ProfileRecord, ProfileStore};
    use async_trait::async_trait;

    struct NullIdentityService {
        bus: AuthEventBus,
    }

    #[async_trait]
    impl IdentityService for NullIdentityService {
        async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(None)
        }
        fn subscribe(&self) -> EventSubscription {
            self.bus.subscribe()
        }
        async fn sign_in_with_oauth(&self, _provider: AuthProvider) -> Result<(), AuthError> {
            Ok(())
        }
        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<Session, AuthError> {
            Err(AuthError::Rejected {
                status: 400,
                message: "Invalid login credentials".into(),
            })
        }
        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            _display_name: Option<&str>,
        ) -> Result<(), AuthError> {
            Ok(())
        }
        async fn sign_out(&self) -> Result<(), AuthError> {
            Ok(())
        }
    }

    struct NullProfileStore;

    #[async_trait]
    impl ProfileStore for NullProfileStore {
        async fn upsert(&self, _record: &ProfileRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn started_synchronizer() -> Arc<SessionSynchronizer> {
        Arc::new(
            SessionSynchronizer::start(
                Arc::new(NullIdentityService {
                    bus: AuthEventBus::new(),
                }),
                Arc::new(NullProfileStore),
                NotificationHub::default(),
            )
            .await,
        )
    }

    #[test]
    #[should_panic(expected = "used before a synchronizer was installed")]
    fn handle_before_install_is_fatal() {
        let context = SessionContext::new();
        let _ = context.handle();
    }

    #[test]
    fn try_handle_before_install_is_none() {
        let context = SessionContext::new();
        assert!(context.try_handle().is_none());
    }

    #[tokio::test]
    async fn clones_resolve_the_same_instance() {
        let context = SessionContext::new();
        let consumer_view = context.clone();

        context.install(started_synchronizer().await);

        let a = context.handle();
        let b = consumer_view.handle();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    #[should_panic(expected = "install called twice")]
    async fn double_install_is_fatal() {
        let context = SessionContext::new();
        context.install(started_synchronizer().await);
        context.install(started_synchronizer().await);
    }
}
