//! PostgREST-backed profile store.
//!
//! One operation: whole-row upsert into the hosted `profiles` table,
//! keyed by the identity's stable id. `Prefer: resolution=merge-duplicates`
//! turns the insert into an upsert on the primary key.

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::profile::{ProfileRecord, ProfileStore};

/// Profile mirror against the hosted Supabase `profiles` table.
pub struct SupabaseProfileStore {
    config: BackendConfig,
    http: reqwest::Client,
}

impl SupabaseProfileStore {
    /// Create a new store against the configured backend.
    pub fn new(config: BackendConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { config, http })
    }

    /// Get the base headers for authenticated requests.
    fn auth_headers(&self) -> Vec<(&str, String)> {
        vec![
            ("apikey", self.config.anon_key.clone()),
            (
                "Authorization",
                format!("Bearer {}", self.config.anon_key),
            ),
        ]
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfileStore {
    async fn upsert(&self, record: &ProfileRecord) -> anyhow::Result<()> {
        let mut request = self
            .http
            .post(self.config.table_url("profiles"))
            .json(record)
            .header("Prefer", "resolution=merge-duplicates");

        for (key, value) in self.auth_headers() {
            request = request.header(key, value);
        }

        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Profile upsert failed ({status}): {body}");
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str) -> BackendConfig {
        BackendConfig {
            url: url.trim_end_matches('/').to_string(),
            anon_key: "test-anon-key".into(),
            redirect_target: "https://app.medanalyze.example/".into(),
        }
    }

    fn test_record() -> ProfileRecord {
        ProfileRecord::from_identity(&Identity {
            id: "u-alice".into(),
            email: "alice@example.com".into(),
            display_name: Some("Alice Example".into()),
            avatar_url: None,
            provider: Some("google".into()),
        })
    }

    #[tokio::test]
    async fn upsert_posts_the_whole_row_with_merge_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(header("apikey", "test-anon-key"))
            .and(header("Prefer", "resolution=merge-duplicates"))
            .and(body_partial_json(serde_json::json!({
                "id": "u-alice",
                "email": "alice@example.com",
                "full_name": "Alice Example",
                "avatar_url": null,
                "provider": "google",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseProfileStore::new(test_config(&server.uri())).unwrap();
        store.upsert(&test_record()).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_failure_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(403).set_body_string("row-level security"))
            .mount(&server)
            .await;

        let store = SupabaseProfileStore::new(test_config(&server.uri())).unwrap();
        let err = store.upsert(&test_record()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("403"));
        assert!(message.contains("row-level security"));
    }
}
