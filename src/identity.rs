//! Identity domain types and the consumed identity-service contract.
//!
//! The session core never verifies passwords or mints tokens itself —
//! that all belongs to the hosted identity service. What lives here:
//! - `Session` / `Identity`: the credential we hold and the user derived
//!   from it
//! - `AuthEvent`: provider-pushed state-change events
//! - `IdentityService`: the async contract the synchronizer consumes
//! - `AuthEventBus`: ordered per-subscriber event fan-out with explicit,
//!   idempotent unsubscription
//!
//! ## Design
//! - Events are delivered over an unbounded FIFO channel per subscriber,
//!   so a slow consumer never reorders or drops provider emissions.
//! - Closing a subscription is level-triggered (`CancellationToken`):
//!   a second close is a no-op, and a pending `next()` resolves to `None`
//!   immediately.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ── Domain types ─────────────────────────────────────────────────

/// Minimal authenticated-user record, derived from the session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier assigned by the identity service.
    pub id: String,
    /// Primary email address.
    pub email: String,
    /// Optional display name from provider metadata.
    pub display_name: Option<String>,
    /// Optional avatar reference from provider metadata.
    pub avatar_url: Option<String>,
    /// Auth provider that vouched for this identity ("google", "github", "email").
    pub provider: Option<String>,
}

/// Opaque token-bearing credential issued by the identity service.
///
/// The core holds the most recently observed value and derives [`Identity`]
/// from it; it never inspects or refreshes the tokens itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token the service accepts to mint a fresh session.
    pub refresh_token: String,
    /// Expiry as Unix epoch seconds, when the service reports one.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// The authenticated user this session belongs to.
    pub user: Identity,
}

/// OAuth providers the application offers on its sign-in screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthProvider {
    Google,
    GitHub,
}

impl AuthProvider {
    /// Provider slug as the identity service spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
        }
    }
}

// ── Auth events ──────────────────────────────────────────────────

/// Kinds of state-change events the identity service pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventKind {
    /// A user completed sign-in; the event carries the new session.
    SignedIn,
    /// The current user signed out.
    SignedOut,
    /// Tokens were rotated; the event carries the replacement session.
    TokenRefreshed,
    /// Provider-side user metadata changed; the event carries the session.
    UserUpdated,
}

impl AuthEventKind {
    /// Event slug for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
            Self::UserUpdated => "user_updated",
        }
    }
}

/// A provider-pushed auth state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// Session payload; `None` for sign-out.
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            session: Some(session),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────

/// Failure modes of identity-service calls.
///
/// These are runtime conditions, reported to the UI as notifications and
/// returned as command-level results. They never escape as panics.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The service understood the request and said no (bad credentials,
    /// provider rejection, duplicate signup, ...).
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// The service could not be reached.
    #[error("identity service unreachable: {0}")]
    Transport(String),
    /// The service answered with a payload the client could not decode.
    #[error("malformed identity service response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

// ── Event subscription ───────────────────────────────────────────

/// Read end of an auth-event subscription.
///
/// Events arrive in the order the service emitted them. The subscription
/// stays live until [`close`](Self::close) (or a [`SubscriptionCloser`])
/// is invoked or the emitter goes away.
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<AuthEvent>,
    cancel: CancellationToken,
}

impl EventSubscription {
    /// Next event, or `None` once the subscription is closed or the
    /// emitter has shut down.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Detached close handle, usable from another task.
    pub fn closer(&self) -> SubscriptionCloser {
        SubscriptionCloser {
            cancel: self.cancel.clone(),
        }
    }

    /// Close the subscription. Safe to call more than once.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }
}

/// Idempotent close handle for an [`EventSubscription`].
#[derive(Clone)]
pub struct SubscriptionCloser {
    cancel: CancellationToken,
}

impl SubscriptionCloser {
    /// Close the subscription. A second invocation is a no-op.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// Fan-out of auth events to any number of ordered subscribers.
///
/// Emitters (the production client, test fakes) hold one of these and
/// push every state change through it. Dead subscribers are pruned on
/// the next emit.
#[derive(Clone, Default)]
pub struct AuthEventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Events emitted after this call are
    /// delivered in emission order.
    pub fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        EventSubscription {
            rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: AuthEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers (dead ones linger until the next emit).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

// ── Consumed contract ────────────────────────────────────────────

/// The identity-service capability the session core consumes.
///
/// One production implementation exists
/// ([`SupabaseAuthClient`](crate::supabase::SupabaseAuthClient)); tests
/// substitute in-process fakes.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Current session, if the service considers one active.
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribe to provider-pushed auth events.
    fn subscribe(&self) -> EventSubscription;

    /// Kick off the OAuth redirect flow for `provider`. State arrives
    /// later through the event stream, not from this call.
    async fn sign_in_with_oauth(&self, provider: AuthProvider) -> Result<(), AuthError>;

    /// Password sign-in. On success the service emits `SignedIn`.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    /// Create an account, with the display name attached as profile
    /// metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), AuthError>;

    /// End the current session. On success the service emits `SignedOut`.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

// ── Tests ────────────────────────────────────────────────────────
