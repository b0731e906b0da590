//! GoTrue-backed identity service client.
//!
//! Wraps the hosted auth REST API:
//! - `POST /auth/v1/token?grant_type=password` — password sign-in
//! - `POST /auth/v1/token?grant_type=refresh_token` — session restore/rotation
//! - `POST /auth/v1/signup` — account creation (display name as metadata)
//! - `POST /auth/v1/logout` — sign-out
//! - `GET  /auth/v1/authorize?provider=...` — OAuth redirect dispatch
//!
//! The client holds the most recently issued session in memory and emits
//! an [`AuthEvent`] for every state change it performs, in order. Durable
//! token storage stays with the embedding application: it may hand a
//! persisted refresh token to `with_restored_refresh_token` and the first
//! `get_current_session` call redeems it.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::identity::{
    AuthError, AuthEvent, AuthEventBus, AuthProvider, EventSubscription, Identity,
    IdentityService, Session,
};

/// Seam for launching the OAuth authorize URL (browser, webview, ...).
pub type OAuthOpener = Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// Identity service client for the hosted Supabase GoTrue API.
pub struct SupabaseAuthClient {
    config: BackendConfig,
    http: reqwest::Client,
    /// Most recently issued session, if any.
    current: Mutex<Option<Session>>,
    /// Persisted refresh token handed over by the embedding app, redeemed
    /// once by `get_current_session`.
    restored_refresh_token: Mutex<Option<String>>,
    events: AuthEventBus,
    opener: OAuthOpener,
}

impl SupabaseAuthClient {
    /// Create a new client against the configured backend.
    pub fn new(config: BackendConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config,
            http,
            current: Mutex::new(None),
            restored_refresh_token: Mutex::new(None),
            events: AuthEventBus::new(),
            opener: Box::new(|url| {
                tracing::info!(url, "OAuth authorize URL ready (no opener wired)");
                Ok(())
            }),
        })
    }

    /// Hand over a refresh token the application persisted from a previous
    /// run; the next `get_current_session` call redeems it.
    pub fn with_restored_refresh_token(self, token: impl Into<String>) -> Self {
        *self.restored_refresh_token.lock() = Some(token.into());
        self
    }

    /// Wire the seam that launches the OAuth authorize URL.
    pub fn with_opener(mut self, opener: OAuthOpener) -> Self {
        self.opener = opener;
        self
    }

    /// Get the base headers for API requests.
    fn api_headers(&self) -> Vec<(&str, String)> {
        vec![
            ("apikey", self.config.anon_key.clone()),
            (
                "Authorization",
                format!("Bearer {}", self.config.anon_key),
            ),
        ]
    }

    /// Build the OAuth authorize URL for a provider.
    ///
    /// Google gets `access_type=offline&prompt=consent` so a refresh token
    /// is issued on every consent round-trip.
    fn authorize_url(&self, provider: AuthProvider) -> String {
        let mut url = format!(
            "{}?provider={}&redirect_to={}",
            self.config.auth_url("authorize"),
            provider.as_str(),
            urlencoding::encode(&self.config.redirect_target),
        );
        if provider == AuthProvider::Google {
            url.push_str("&access_type=offline&prompt=consent");
        }
        url
    }

    /// Redeem a refresh token for a fresh session.
    async fn redeem_refresh_token(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let url = format!(
            "{}?grant_type=refresh_token",
            self.config.auth_url("token")
        );
        let payload = serde_json::json!({ "refresh_token": refresh_token });

        let mut request = self.http.post(&url).json(&payload);
        for (key, value) in self.api_headers() {
            request = request.header(key, value);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        let token: TokenResponse = resp.json().await?;
        token.into_session()
    }

    /// Publish a new current session and emit the given event for it.
    fn install_session(&self, session: Session, event: fn(Session) -> AuthEvent) {
        *self.current.lock() = Some(session.clone());
        self.events.emit(event(session));
    }

    /// Rotate the current session's tokens. Emits `TokenRefreshed`.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .current
            .lock()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| AuthError::Rejected {
                status: 401,
                message: "no active session to refresh".into(),
            })?;

        let session = self.redeem_refresh_token(&refresh_token).await?;
        self.install_session(session.clone(), AuthEvent::token_refreshed);
        Ok(session)
    }
}

#[async_trait]
impl IdentityService for SupabaseAuthClient {
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        if let Some(session) = self.current.lock().clone() {
            return Ok(Some(session));
        }

        let restored = self.restored_refresh_token.lock().take();
        let Some(token) = restored else {
            return Ok(None);
        };

        // Initial restore is a pull: the session goes straight to the
        // caller, no event is emitted for it.
        let session = self.redeem_refresh_token(&token).await?;
        *self.current.lock() = Some(session.clone());
        Ok(Some(session))
    }

    fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_oauth(&self, provider: AuthProvider) -> Result<(), AuthError> {
        let url = self.authorize_url(provider);
        tracing::info!(provider = provider.as_str(), "Dispatching OAuth redirect");
        (self.opener)(&url).map_err(|err| AuthError::Transport(err.to_string()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}?grant_type=password", self.config.auth_url("token"));
        let payload = serde_json::json!({ "email": email, "password": password });

        let mut request = self.http.post(&url).json(&payload);
        for (key, value) in self.api_headers() {
            request = request.header(key, value);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        let token: TokenResponse = resp.json().await?;
        let session = token.into_session()?;
        self.install_session(session.clone(), AuthEvent::signed_in);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), AuthError> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": display_name },
        });

        let mut request = self.http.post(self.config.auth_url("signup")).json(&payload);
        for (key, value) in self.api_headers() {
            request = request.header(key, value);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        // With email confirmation disabled the service returns a full
        // session; otherwise just the pending user record.
        let body: SignUpResponse = resp.json().await?;
        if body.access_token.is_some() {
            let session = TokenResponse {
                access_token: body.access_token.unwrap_or_default(),
                refresh_token: body.refresh_token.unwrap_or_default(),
                expires_at: body.expires_at,
                user: body.user,
            }
            .into_session()?;
            self.install_session(session, AuthEvent::signed_in);
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current.lock().clone() else {
            // Already signed out: the no-op the caller expects.
            return Ok(());
        };

        // The logout bearer is the session's own access token, not the
        // anon key.
        let request = self
            .http
            .post(self.config.auth_url("logout"))
            .header("apikey", self.config.anon_key.clone())
            .header(
                "Authorization",
                format!("Bearer {}", session.access_token),
            );

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        *self.current.lock() = None;
        self.events.emit(AuthEvent::signed_out());
        Ok(())
    }
}

// ── Wire payloads ────────────────────────────────────────────────

/// GoTrue token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Option<UserPayload>,
}

/// GoTrue signup response: a full session or a bare user record.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserPayload>,
}

/// GoTrue user object, flattened into [`Identity`].
#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
    #[serde(default)]
    app_metadata: serde_json::Value,
}

impl TokenResponse {
    fn into_session(self) -> Result<Session, AuthError> {
        let user = self
            .user
            .ok_or_else(|| AuthError::Malformed("token response without user".into()))?;
        Ok(Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
            user: user.into_identity(),
        })
    }
}

impl UserPayload {
    /// Map the provider metadata onto the identity, with the same
    /// fallbacks the hosted providers use: `full_name` then `name` for
    /// the display name, `avatar_url` then `picture` for the avatar.
    fn into_identity(self) -> Identity {
        let meta_str = |value: &serde_json::Value, key: &str| {
            value.get(key).and_then(|v| v.as_str()).map(String::from)
        };

        Identity {
            id: self.id,
            email: self.email.unwrap_or_default(),
            display_name: meta_str(&self.user_metadata, "full_name")
                .or_else(|| meta_str(&self.user_metadata, "name")),
            avatar_url: meta_str(&self.user_metadata, "avatar_url")
                .or_else(|| meta_str(&self.user_metadata, "picture")),
            provider: meta_str(&self.app_metadata, "provider"),
        }
    }
}

/// GoTrue error bodies come in a few historical shapes.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Shape a non-success response into the rejection error.
async fn rejection(resp: reqwest::Response) -> AuthError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorPayload>(&body)
        .ok()
        .and_then(|p| p.error_description.or(p.msg).or(p.error))
        .unwrap_or_else(|| format!("identity service returned status {status}"));
    AuthError::Rejected { status, message }
}

// ── Tests ────────────────────────────────────────────────────────
