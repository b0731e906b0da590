//! Supabase integration for MedAnalyze.
//!
//! Production implementations of the two consumed contracts against the
//! hosted backend:
//! - [`SupabaseAuthClient`] — identity service via the GoTrue auth REST API
//! - [`SupabaseProfileStore`] — profile mirror via PostgREST
//!
//! ## Design
//! - HTTP client (reqwest) against the project's `/auth/v1` and `/rest/v1`
//!   endpoints
//! - Anon-key authentication — all calls are client-side and RLS-scoped
//! - The auth client is also the auth-event emitter: every state change it
//!   performs is pushed to subscribers in emission order

pub mod auth;
pub mod profiles;

pub use auth::SupabaseAuthClient;
pub use profiles::SupabaseProfileStore;
