//! In-process providers
//!
//! Used by the binary's offline mode and throughout the test suite. They
//! follow the hosted provider's observable behaviour: the same error
//! messages, listing in key order, session events on sign-in/sign-out.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::backend::error::ProviderError;
use crate::backend::types::{AuthEvent, Session, StoredObject, User};
use crate::backend::{AuthProvider, AuthSubscription, StorageProvider, AUTH_EVENT_CAPACITY, RESOURCE_EXISTS};

/// Provider message for a failed password sign-in
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Provider message for a rejected sign-up password
pub const WEAK_PASSWORD: &str = "Password should be at least 6 characters.";

/// Provider message for a duplicate sign-up
pub const USER_EXISTS: &str = "User already registered";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory auth provider
pub struct MemoryAuth {
    users: Mutex<HashMap<String, String>>,
    session: Mutex<Option<Session>>,
    fail_get_session: Mutex<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
    next_token: AtomicU64,
}

impl MemoryAuth {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            users: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            fail_get_session: Mutex::new(None),
            events,
            next_token: AtomicU64::new(1),
        }
    }

    /// Register an account directly, bypassing validation
    pub fn with_user(self, email: &str, password: &str) -> Self {
        lock(&self.users).insert(email.to_string(), password.to_string());
        self
    }

    /// Make `get_session` fail with `message` until cleared
    pub fn fail_get_session(&self, message: Option<&str>) {
        *lock(&self.fail_get_session) = message.map(str::to_string);
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Issue a fresh token for the current session, as a provider-side refresh would
    pub fn refresh(&self) -> Option<Session> {
        let refreshed = {
            let mut current = lock(&self.session);
            let session = current.as_mut()?;
            session.access_token = self.issue_token("access");
            session.clone()
        };
        let _ = self.events.send(AuthEvent::token_refreshed(refreshed.clone()));
        Some(refreshed)
    }

    fn issue_token(&self, kind: &str) -> String {
        format!("{}-{}", kind, self.next_token.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        if let Some(message) = lock(&self.fail_get_session).clone() {
            return Err(ProviderError::new(message));
        }
        Ok(lock(&self.session).clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let known = lock(&self.users).get(email).is_some_and(|p| p == password);
        if !known {
            return Err(ProviderError::new(INVALID_CREDENTIALS));
        }

        let session = Session {
            access_token: self.issue_token("access"),
            refresh_token: self.issue_token("refresh"),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            user: User {
                id: format!("user-{}", email),
                email: Some(email.to_string()),
            },
        };
        *lock(&self.session) = Some(session.clone());
        let _ = self.events.send(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        if password.chars().count() < 6 {
            return Err(ProviderError::new(WEAK_PASSWORD));
        }
        let mut users = lock(&self.users);
        if users.contains_key(email) {
            return Err(ProviderError::new(USER_EXISTS));
        }
        users.insert(email.to_string(), password.to_string());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let had_session = lock(&self.session).take().is_some();
        if had_session {
            let _ = self.events.send(AuthEvent::signed_out());
        }
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

/// Storage operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    List,
    Upload,
    Remove,
    Download,
}

struct StoredEntry {
    data: Bytes,
    content_type: String,
    created_at: DateTime<Utc>,
}

/// In-memory storage namespace. Lists in key order, like an S3 bucket.
pub struct MemoryStorage {
    namespace: String,
    objects: Mutex<BTreeMap<String, StoredEntry>>,
    failing: Mutex<HashSet<StorageOp>>,
}

impl MemoryStorage {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            objects: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Seed an object directly
    pub fn with_object(self, name: &str, data: &[u8]) -> Self {
        lock(&self.objects).insert(
            name.to_string(),
            StoredEntry {
                data: Bytes::copy_from_slice(data),
                content_type: "application/octet-stream".to_string(),
                created_at: Utc::now(),
            },
        );
        self
    }

    /// Make `op` fail (or succeed again)
    pub fn set_failing(&self, op: StorageOp, failing: bool) {
        let mut ops = lock(&self.failing);
        if failing {
            ops.insert(op);
        } else {
            ops.remove(&op);
        }
    }

    /// Names currently stored
    pub fn names(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Content type an object was uploaded with
    pub fn content_type(&self, name: &str) -> Option<String> {
        lock(&self.objects).get(name).map(|e| e.content_type.clone())
    }

    fn check(&self, op: StorageOp) -> Result<(), ProviderError> {
        if lock(&self.failing).contains(&op) {
            return Err(ProviderError::new(format!("{:?} failed: service unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn list(&self) -> Result<Vec<StoredObject>, ProviderError> {
        self.check(StorageOp::List)?;
        Ok(lock(&self.objects)
            .iter()
            .map(|(name, entry)| StoredObject {
                name: name.clone(),
                created_at: Some(entry.created_at),
                size: entry.data.len() as u64,
            })
            .collect())
    }

    fn public_url(&self, name: &str) -> String {
        format!("memory://{}/{}", self.namespace, name)
    }

    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), ProviderError> {
        self.check(StorageOp::Upload)?;
        let mut objects = lock(&self.objects);
        if objects.contains_key(name) {
            return Err(ProviderError::new(RESOURCE_EXISTS));
        }
        objects.insert(
            name.to_string(),
            StoredEntry {
                data,
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, names: &[String]) -> Result<(), ProviderError> {
        self.check(StorageOp::Remove)?;
        let mut objects = lock(&self.objects);
        for name in names {
            objects.remove(name);
        }
        Ok(())
    }

    async fn download(&self, name: &str) -> Result<Bytes, ProviderError> {
        self.check(StorageOp::Download)?;
        lock(&self.objects)
            .get(name)
            .map(|e| e.data.clone())
            .ok_or_else(|| ProviderError::new("Object not found"))
    }
}
