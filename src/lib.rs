//! MedAnalyze session core.
//!
//! The MedAnalyze client lets a user upload medical documents, have them
//! analyzed, and review the results on a dashboard. Authentication lives
//! in a hosted identity service; this crate is the piece in between — it
//! owns the one authoritative answer to "is someone logged in, and as
//! whom," and keeps it consistent with the service's own notion of
//! session validity.
//!
//! ## What lives here
//!
//! - [`session`] — the session synchronizer: initial session fetch,
//!   ordered auth-event handling, sign-in/up/out commands, detached
//!   profile reconciliation, idempotent teardown, and the install-once
//!   [`SessionContext`](session::SessionContext) the UI resolves it
//!   through
//! - [`identity`] — domain types ([`Identity`](identity::Identity),
//!   [`Session`](identity::Session), [`AuthEvent`](identity::AuthEvent))
//!   and the consumed [`IdentityService`](identity::IdentityService)
//!   contract
//! - [`profile`] — the [`ProfileStore`](profile::ProfileStore) mirror
//!   contract and its record shape
//! - [`supabase`] — production implementations of both contracts against
//!   the hosted backend (GoTrue auth REST, PostgREST tables)
//! - [`notify`] — the fire-and-forget notification channel the UI
//!   renders as toasts
//! - [`config`] — backend connection configuration
//!
//! ## What deliberately does not
//!
//! Password verification, token minting, OAuth cryptography, document
//! analysis, and durable token storage all belong to the hosted services
//! or the embedding shell. This core only orchestrates calls to them and
//! reacts to their asynchronous signals.
//!
//! ## Wiring
//!
//! ```no_run
//! use std::sync::Arc;
//! use medanalyze_session::config::BackendConfig;
//! use medanalyze_session::notify::NotificationHub;
//! use medanalyze_session::session::{SessionContext, SessionSynchronizer};
//! use medanalyze_session::supabase::{SupabaseAuthClient, SupabaseProfileStore};
//!
//! # async fn wire() -> anyhow::Result<()> {
//! let config = BackendConfig::from_env().expect("backend configuration missing");
//! let service = Arc::new(SupabaseAuthClient::new(config.clone())?);
//! let profiles = Arc::new(SupabaseProfileStore::new(config)?);
//! let notifier = NotificationHub::default();
//!
//! let context = SessionContext::new();
//! let synchronizer =
//!     SessionSynchronizer::start(service, profiles, notifier).await;
//! context.install(Arc::new(synchronizer));
//!
//! // Consumers: context.handle().state(), .subscribe_state(), commands.
//! // On UI teardown: context.handle().teardown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod identity;
pub mod notify;
pub mod profile;
pub mod session;
pub mod supabase;

pub use config::BackendConfig;
pub use identity::{AuthError, AuthEvent, AuthEventKind, AuthProvider, Identity, Session};
pub use notify::{Notification, NotificationHub, Severity};
pub use profile::{ProfileRecord, ProfileStore};
pub use session::{SessionContext, SessionState, SessionSynchronizer};
