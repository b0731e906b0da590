//! Backend connection configuration.
//!
//! MedAnalyze delegates authentication and profile storage to a hosted
//! Supabase project. The session core needs three values to reach it:
//! the project URL, the public anon key, and the destination the OAuth
//! redirect flow should return to.

use serde::{Deserialize, Serialize};

/// Hosted backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Supabase project URL (e.g., https://xxxx.supabase.co).
    pub url: String,
    /// Public anon key (client-side, RLS-scoped).
    pub anon_key: String,
    /// Where the OAuth redirect flow lands after the provider round-trip.
    pub redirect_target: String,
}

impl BackendConfig {
    /// Load from environment variables.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("MEDANALYZE_SUPABASE_URL").ok()?;
        let anon_key = std::env::var("MEDANALYZE_SUPABASE_ANON_KEY").ok()?;
        let redirect_target = std::env::var("MEDANALYZE_REDIRECT_URL")
            .unwrap_or_else(|_| "http://localhost:5173/".to_string());

        if url.is_empty() || anon_key.is_empty() {
            return None;
        }

        Some(Self {
            url,
            anon_key,
            redirect_target,
        })
    }

    /// Base URL for the auth (GoTrue) API.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url.trim_end_matches('/'), path)
    }

    /// Base URL for a PostgREST table.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
