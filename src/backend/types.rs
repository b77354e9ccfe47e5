//! Provider data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user attached to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session issued by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    /// Whether the access token expires within `margin` of `now`
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - margin <= now,
            None => false,
        }
    }

    /// Whether the access token is already past its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_within(now, chrono::Duration::zero())
    }
}

/// Kind of session change reported by the auth provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl AuthChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthChange::SignedIn => "SIGNED_IN",
            AuthChange::SignedOut => "SIGNED_OUT",
            AuthChange::TokenRefreshed => "TOKEN_REFRESHED",
        }
    }
}

/// A session change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub change: AuthChange,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            change: AuthChange::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            change: AuthChange::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            change: AuthChange::TokenRefreshed,
            session: Some(session),
        }
    }
}

/// An object in the storage namespace, as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size: u64,
}
