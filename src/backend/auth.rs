//! GoTrue HTTP auth provider
//!
//! Talks to the hosted auth API under `/auth/v1/`:
//! - `POST token?grant_type=password` - sign in
//! - `POST token?grant_type=refresh_token` - refresh
//! - `POST signup` - register
//! - `POST logout` - sign out
//!
//! The client keeps the current session in memory and broadcasts every
//! change to subscribers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::backend::error::ProviderError;
use crate::backend::types::{AuthEvent, Session, User};
use crate::backend::{AuthProvider, AuthSubscription, AUTH_EVENT_CAPACITY};

/// Refresh this long before the access token expires
const REFRESH_MARGIN_SECS: i64 = 60;

/// Poll interval while there is nothing to refresh
const IDLE_REFRESH_POLL: Duration = Duration::from_secs(30);

/// Lower bound between refresh attempts
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + chrono::Duration::seconds(secs)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Error body shapes returned by the auth API across versions
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extract the human-readable message from an error response
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.error_description).or(b.message).or(b.error))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Auth provider backed by the hosted GoTrue API
pub struct GoTrueClient {
    http: reqwest::Client,
    auth_url: Url,
    api_key: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl GoTrueClient {
    /// Create a client for the project at `project_url`
    pub fn new(project_url: &Url, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let auth_url = auth_base_url(project_url)?;
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            http: reqwest::Client::new(),
            auth_url,
            api_key: api_key.into(),
            session: RwLock::new(None),
            events,
        })
    }

    /// Restore a previously persisted session without emitting an event
    pub async fn restore(&self, session: Option<Session>) {
        if let Some(s) = &session {
            tracing::debug!("Restoring persisted session for user {}", s.user.id);
        }
        *self.session.write().await = session;
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh(&self) -> Result<Session, ProviderError> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| ProviderError::new("No session to refresh"))?;

        let url = self.endpoint("token", Some("refresh_token"))?;
        let body = RefreshGrant {
            refresh_token: &refresh_token,
        };

        let session = match self.post_json::<_, TokenResponse>(url, &body, None).await {
            Ok(response) => response.into_session(Utc::now()),
            Err(e) => {
                tracing::warn!("Session refresh failed: {}", e);
                return Err(e);
            }
        };

        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::token_refreshed(session.clone()));
        tracing::debug!("Session refreshed for user {}", session.user.id);
        Ok(session)
    }

    /// Keep the session fresh in the background until the handle is aborted
    pub fn spawn_auto_refresh(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let delay = self.next_refresh_delay(Utc::now()).await;
                tokio::time::sleep(delay).await;

                let due = self
                    .session
                    .read()
                    .await
                    .as_ref()
                    .is_some_and(|s| s.expires_within(Utc::now(), refresh_margin()));
                if due {
                    if let Err(e) = self.refresh().await {
                        tracing::warn!("Background refresh failed, retrying later: {}", e);
                    }
                }
            }
        })
    }

    async fn next_refresh_delay(&self, now: DateTime<Utc>) -> Duration {
        let expires_at = self.session.read().await.as_ref().and_then(|s| s.expires_at);
        match expires_at {
            Some(expires_at) => (expires_at - refresh_margin() - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .max(MIN_REFRESH_DELAY),
            None => IDLE_REFRESH_POLL,
        }
    }

    fn endpoint(&self, path: &str, grant_type: Option<&str>) -> Result<Url, ProviderError> {
        let mut url = self
            .auth_url
            .join(path)
            .map_err(|e| ProviderError::new(format!("Invalid auth endpoint {}: {}", path, e)))?;
        if let Some(grant) = grant_type {
            url.query_pairs_mut().append_pair("grant_type", grant);
        }
        Ok(url)
    }

    fn request(&self, url: Url, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.http.post(url).header("apikey", &self.api_key);
        match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_json<B, T>(&self, url: Url, body: &B, bearer: Option<&str>) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let text = execute(self.request(url, bearer).json(body)).await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::new(format!("Unexpected auth response: {}", e)))
    }
}

/// Send `request`, returning the body of a 2xx response
async fn execute(request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::new(error_message(status, &text)));
    }
    Ok(text)
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        match self.session.read().await.as_ref() {
            None => return Ok(None),
            Some(session) if !session.is_expired(Utc::now()) => return Ok(Some(session.clone())),
            Some(_) => {}
        }

        tracing::info!("Stored session expired, refreshing");
        match self.refresh().await {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                let dropped = self.session.write().await.take().is_some();
                if dropped {
                    let _ = self.events.send(AuthEvent::signed_out());
                }
                Err(e)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let url = self.endpoint("token", Some("password"))?;
        let body = PasswordCredentials { email, password };

        let session = self
            .post_json::<_, TokenResponse>(url, &body, None)
            .await?
            .into_session(Utc::now());

        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::signed_in(session.clone()));
        tracing::info!("Signed in as {}", email);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let url = self.endpoint("signup", None)?;
        let body = PasswordCredentials { email, password };

        // The response may carry a session when confirmation is disabled;
        // registering never authenticates here.
        execute(self.request(url, None).json(&body)).await?;
        tracing::info!("Registered account {}", email);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let access_token = self.session.read().await.as_ref().map(|s| s.access_token.clone());

        if let Some(token) = access_token {
            let url = self.endpoint("logout", None)?;
            if let Err(e) = execute(self.request(url, Some(&token))).await {
                // The local session is cleared regardless
                tracing::warn!("Remote sign-out failed: {}", e);
            }
        }

        let had_session = self.session.write().await.take().is_some();
        if had_session {
            let _ = self.events.send(AuthEvent::signed_out());
        }
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

fn refresh_margin() -> chrono::Duration {
    chrono::Duration::seconds(REFRESH_MARGIN_SECS)
}

/// `<project>/auth/v1/`, with a trailing slash so relative joins stay inside it
fn auth_base_url(project_url: &Url) -> Result<Url, ProviderError> {
    if project_url.cannot_be_a_base() {
        return Err(ProviderError::new(format!("Invalid project URL: {}", project_url)));
    }
    let mut url = project_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["auth", "v1", ""]);
    }
    Ok(url)
}
