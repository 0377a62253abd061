//! Signed-in user state.
//!
//! A [`Session`] owns the current [`SessionState`] and publishes every change
//! on a `watch` channel; views hold a receiver instead of reading globals.
//! The last signed-in user is cached on disk so a restart without network
//! still comes up signed in.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};
use tokio::sync::watch;

use crate::{config::Config, http::truncate_body};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    SignedOut,
    SignedIn(AuthUser),
}

impl SessionState {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            SessionState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;
    async fn send_password_reset(&self, email: &str) -> Result<()>;
    /// Exchange the user's refresh token for a new id token.
    async fn refresh(&self, user: &AuthUser) -> Result<AuthUser>;
}

/// Email/password accounts through the Firebase Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct FirebaseAuth {
    api_key: String,
    base_url: String,
    token_url: String,
    http: Client,
}

impl FirebaseAuth {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            token_url: SECURE_TOKEN_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.backend()?.api_key.clone()))
    }

    /// Point both the accounts and the token endpoints at `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.token_url = self.base_url.clone();
        self
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<String> {
        let url = format!("{}/v1/accounts:{method}", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Identity Toolkit ({method})"))?;

        checked_body(res, method).await
    }
}

async fn checked_body(res: reqwest::Response, what: &str) -> Result<String> {
    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {what} response body"))?;

    if !status.is_success() {
        let reason = serde_json::from_str::<FbErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| truncate_body(&body));
        bail!("Firebase {what} failed with status {status}: {reason}");
    }

    Ok(body)
}

fn expiry_after(expires_in: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = expires_in
        .parse()
        .with_context(|| format!("Invalid token lifetime: {expires_in}"))?;
    Ok(Utc::now() + Duration::seconds(secs))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FbSignInResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// Secure Token API replies in snake_case, unlike the accounts API.
#[derive(Debug, Deserialize)]
struct FbRefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct FbError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FbErrorResponse {
    error: FbError,
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let body = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let parsed: FbSignInResponse =
            serde_json::from_str(&body).context("Failed to parse sign-in JSON")?;

        Ok(AuthUser {
            expires_at: expiry_after(&parsed.expires_in)?,
            uid: parsed.local_id,
            email: parsed.email,
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.call("sendOobCode", json!({ "requestType": "PASSWORD_RESET", "email": email }))
            .await?;
        Ok(())
    }

    async fn refresh(&self, user: &AuthUser) -> Result<AuthUser> {
        let url = format!("{}/v1/token", self.token_url.trim_end_matches('/'));

        let res = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", user.refresh_token.as_str())])
            .send()
            .await
            .context("Failed to send request to Secure Token (refresh)")?;

        let body = checked_body(res, "token refresh").await?;
        let parsed: FbRefreshResponse =
            serde_json::from_str(&body).context("Failed to parse token refresh JSON")?;

        Ok(AuthUser {
            expires_at: expiry_after(&parsed.expires_in)?,
            uid: parsed.user_id,
            email: user.email.clone(),
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
        })
    }
}

/// JSON file holding the last signed-in user.
#[derive(Debug, Clone)]
pub struct UserCache {
    path: PathBuf,
}

impl UserCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<AuthUser>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read user cache: {}", self.path.display()))?;

        let user = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse user cache: {}", self.path.display()))?;

        Ok(Some(user))
    }

    pub fn store(&self, user: &AuthUser) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string(user).context("Failed to serialize user")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write user cache: {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove user cache: {}", self.path.display())),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    identity: Box<dyn IdentityProvider>,
    cache: UserCache,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(identity: Box<dyn IdentityProvider>, cache: UserCache) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { identity, cache, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Token to attach to backend requests, if someone is signed in and it
    /// has not expired yet.
    pub fn id_token(&self) -> Option<String> {
        self.state
            .borrow()
            .user()
            .filter(|u| !u.is_expired(Utc::now()))
            .map(|u| u.id_token.clone())
    }

    /// Like [`Session::id_token`], but an expired token is refreshed first.
    /// A failed refresh yields `None`; the user stays signed in.
    pub async fn valid_id_token(&self) -> Option<String> {
        let user = self.state.borrow().user().cloned()?;
        if !user.is_expired(Utc::now()) {
            return Some(user.id_token);
        }

        match self.identity.refresh(&user).await {
            Ok(fresh) => {
                if let Err(err) = self.cache.store(&fresh) {
                    tracing::error!("Error caching user: {err:#}");
                }
                tracing::debug!(uid = %fresh.uid, "id token refreshed");
                let token = fresh.id_token.clone();
                self.publish(SessionState::SignedIn(fresh));
                Some(token)
            }
            Err(err) => {
                tracing::warn!("Could not refresh expired id token: {err:#}");
                None
            }
        }
    }

    /// Leave `Loading` using the cached user, if any.
    pub fn restore(&self) -> SessionState {
        let next = match self.cache.load() {
            Ok(Some(user)) => SessionState::SignedIn(user),
            Ok(None) => SessionState::SignedOut,
            Err(err) => {
                tracing::error!("Error loading cached user: {err:#}");
                SessionState::SignedOut
            }
        };

        self.publish(next.clone());
        next
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(anyhow!("Please fill in all fields"));
        }

        let user = self.identity.sign_in(email, password).await?;

        if let Err(err) = self.cache.store(&user) {
            tracing::error!("Error caching user: {err:#}");
        }

        tracing::info!(uid = %user.uid, "signed in");
        self.publish(SessionState::SignedIn(user.clone()));
        Ok(user)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(anyhow!("Please enter your email address first"));
        }
        self.identity.send_password_reset(email).await
    }

    pub fn sign_out(&self) {
        if let Err(err) = self.cache.clear() {
            tracing::error!("Error clearing cached user: {err:#}");
        }
        self.publish(SessionState::SignedOut);
    }

    fn publish(&self, next: SessionState) {
        self.state.send_replace(next);
    }
}
