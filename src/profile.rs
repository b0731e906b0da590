//! Profile mirror: the persisted record kept in sync with the
//! authenticated identity.
//!
//! The mirror is best-effort by design — authentication correctness never
//! depends on it. Records are written as whole-row upserts keyed by the
//! identity's stable id, never partially patched, never deleted, and
//! never read back by this core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Row shape of the hosted `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Identity's stable identifier (primary key).
    pub id: String,
    pub email: String,
    /// `None` is written as SQL NULL — a missing display name must not
    /// preserve a stale previous value.
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Build the mirror row for an identity, stamped now.
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            full_name: identity.display_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            provider: identity.provider.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Upsert-by-id persistence for profile records.
///
/// Full-record replace semantics: the stored row becomes exactly the
/// record passed in.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert(&self, record: &ProfileRecord) -> anyhow::Result<()>;
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_identity_copies_all_fields() {
        let identity = Identity {
            id: "user-1".into(),
            email: "alice@example.com".into(),
            display_name: Some("Alice".into()),
            avatar_url: Some("https://cdn.example/alice.png".into()),
            provider: Some("google".into()),
        };

        let record = ProfileRecord::from_identity(&identity);
        assert_eq!(record.id, "user-1");
        assert_eq!(record.email, "alice@example.com");
        assert_eq!(record.full_name.as_deref(), Some("Alice"));
        assert_eq!(record.avatar_url.as_deref(), Some("https://cdn.example/alice.png"));
        assert_eq!(record.provider.as_deref(), Some("google"));
    }

    #[test]
    fn missing_optionals_serialize_as_null() {
        let identity = Identity {
            id: "user-2".into(),
            email: "bob@example.com".into(),
            display_name: None,
            avatar_url: None,
            provider: None,
        };

        let json = serde_json::to_value(ProfileRecord::from_identity(&identity)).unwrap();
        assert!(json["full_name"].is_null());
        assert!(json["avatar_url"].is_null());
        assert!(json["provider"].is_null());
    }
}
