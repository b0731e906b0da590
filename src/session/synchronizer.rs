//! Session synchronizer: pulls the initial session, then follows the
//! identity service's auth-event stream for the rest of its life.
//!
//! ## Responsibilities
//!
//! - Run the initialization protocol exactly once (fetch → publish →
//!   subscribe → spawn the event loop)
//! - Apply provider-pushed events in delivery order, latest-wins
//! - Dispatch profile reconciliation on sign-in without letting mirror
//!   health gate the sign-in flow
//! - Expose the read/command surface the rest of the application depends
//!   on: the state watch, four commands, and teardown
//!
//! All `SessionState` writes go through this module. Commands never touch
//! state directly — a successful sign-in or sign-out becomes visible only
//! when the corresponding event comes back through the stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::identity::{
    AuthError, AuthEvent, AuthEventKind, AuthProvider, EventSubscription, Identity,
    IdentityService, SubscriptionCloser,
};
use crate::notify::{Notification, NotificationHub};
use crate::profile::{ProfileRecord, ProfileStore};
use crate::session::SessionState;

/// The single authoritative owner of [`SessionState`].
pub struct SessionSynchronizer {
    shared: Arc<Shared>,
    closer: SubscriptionCloser,
}

struct Shared {
    service: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    notifier: NotificationHub,
    state_tx: watch::Sender<SessionState>,
    /// Cleared on teardown; every state write checks it first so late
    /// event deliveries and in-flight completions cannot mutate a
    /// torn-down synchronizer.
    alive: AtomicBool,
}

impl SessionSynchronizer {
    /// Run the initialization protocol and hand back the synchronizer.
    ///
    /// The returned value is the whole consumer contract; wrap it in an
    /// `Arc` and install it into a [`SessionContext`]
    /// (`crate::session::SessionContext`) for the UI layers. The caller
    /// owns invoking [`teardown`](Self::teardown) exactly once when the
    /// consuming surface goes away.
    pub async fn start(
        service: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileStore>,
        notifier: NotificationHub,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(SessionState::booting());
        let shared = Arc::new(Shared {
            service,
            profiles,
            notifier,
            state_tx,
            alive: AtomicBool::new(true),
        });

        // Step 1: initial pull. Whatever happens, loading resolves —
        // a fetch error leaves the user unauthenticated, not stuck.
        match shared.service.get_current_session().await {
            Ok(Some(session)) => {
                tracing::info!(user = %session.user.email, "Restored existing session");
                shared.publish(SessionState::authenticated(session));
            }
            Ok(None) => shared.publish(SessionState::anonymous()),
            Err(err) => {
                tracing::warn!("Initial session fetch failed: {err}");
                shared.notifier.error("Authentication Error", &err.to_string());
                shared.publish(SessionState::anonymous());
            }
        }

        // Step 2: subscribe, then drive events on their own task.
        let subscription = shared.service.subscribe();
        let closer = subscription.closer();
        tokio::spawn(Self::run(shared.clone(), subscription));

        Self { shared, closer }
    }

    /// Event loop: one event fully handled (reconciliation dispatched,
    /// notifications emitted) before the next is received.
    async fn run(shared: Arc<Shared>, mut events: EventSubscription) {
        while let Some(event) = events.next().await {
            if !shared.alive.load(Ordering::Acquire) {
                break;
            }
            shared.apply(event);
        }
        tracing::debug!("Auth event loop ended");
    }

    // ── Read surface ─────────────────────────────────────────────

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.shared.state_tx.borrow().clone()
    }

    /// Watch the state; the receiver wakes on every change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    /// Listen for user-facing notifications.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.shared.notifier.subscribe()
    }

    // ── Command operations ───────────────────────────────────────
    //
    // All fail-soft: errors are reported through the notification
    // channel (and, where the caller needs to branch, as an explicit
    // result) — never as a panic across this surface.

    /// Kick off the OAuth redirect flow. State does not change here; a
    /// successful round-trip comes back as a `SignedIn` event.
    pub async fn sign_in_with_provider(&self, provider: AuthProvider) {
        if let Err(err) = self.shared.service.sign_in_with_oauth(provider).await {
            tracing::warn!(provider = provider.as_str(), "OAuth dispatch failed: {err}");
            self.shared.notifier.error("Sign In Error", &err.to_string());
        }
    }

    /// Password sign-in. The result tells the caller whether to navigate;
    /// the state update itself arrives through the event stream.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        match self
            .shared
            .service
            .sign_in_with_password(email, password)
            .await
        {
            Ok(_session) => Ok(()),
            Err(err) => {
                self.shared.notifier.error("Sign In Error", &err.to_string());
                Err(err)
            }
        }
    }

    /// Create an account with the display name attached as profile
    /// metadata.
    pub async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), AuthError> {
        match self
            .shared
            .service
            .sign_up(email, password, display_name)
            .await
        {
            Ok(()) => {
                self.shared.notifier.info(
                    "Account Created",
                    "Your account has been created successfully!",
                );
                Ok(())
            }
            Err(err) => {
                self.shared.notifier.error("Sign Up Error", &err.to_string());
                Err(err)
            }
        }
    }

    /// End the current session. The transition to unauthenticated happens
    /// via the subsequent `SignedOut` event, not here.
    pub async fn sign_out(&self) {
        if let Err(err) = self.shared.service.sign_out().await {
            self.shared.notifier.error("Sign Out Error", &err.to_string());
        }
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Release the event subscription and freeze the state. Idempotent:
    /// a second call is a no-op.
    pub fn teardown(&self) {
        if self.shared.alive.swap(false, Ordering::AcqRel) {
            self.closer.close();
            tracing::info!("Session synchronizer torn down");
        }
    }

    /// Whether teardown has run.
    pub fn is_live(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }
}

impl Shared {
    /// The only state write path. Silently refuses after teardown.
    fn publish(&self, state: SessionState) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        self.state_tx.send_replace(state);
    }

    /// Handle one provider event. Whole-state overwrite: the latest
    /// event always wins, whatever its kind.
    fn apply(&self, event: AuthEvent) {
        tracing::info!(
            kind = event.kind.as_str(),
            user = event
                .session
                .as_ref()
                .map(|s| s.user.email.as_str())
                .unwrap_or(""),
            "Auth state changed"
        );

        match &event.session {
            Some(session) => self.publish(SessionState::authenticated(session.clone())),
            None => self.publish(SessionState::anonymous()),
        }

        match event.kind {
            AuthEventKind::SignedIn => {
                if let Some(session) = event.session {
                    self.reconcile_profile(session.user);
                    self.notifier
                        .info("Welcome!", "You have been successfully signed in.");
                }
            }
            AuthEventKind::SignedOut => {
                self.notifier
                    .info("Signed Out", "You have been successfully signed out.");
            }
            // Token refresh / metadata updates: state already follows the
            // payload, no side-notifications.
            AuthEventKind::TokenRefreshed | AuthEventKind::UserUpdated => {}
        }
    }

    /// Mirror the identity into the profile store on a detached task.
    /// Never joined: mirror failures are logged and swallowed.
    fn reconcile_profile(&self, identity: Identity) {
        let profiles = self.profiles.clone();
        let record = ProfileRecord::from_identity(&identity);
        tokio::spawn(async move {
            if let Err(err) = profiles.upsert(&record).await {
                tracing::warn!("Failed to mirror profile for {}: {err:#}", record.id);
            }
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────
