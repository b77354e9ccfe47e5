//! Hosted backend providers
//!
//! This module defines the contracts the gallery consumes and their
//! implementations:
//! - [`AuthProvider`] / [`StorageProvider`] - async provider traits
//! - [`auth::GoTrueClient`] - HTTP auth client
//! - [`storage::S3Storage`] - S3-compatible object storage
//! - [`memory`] - in-process providers for offline use and tests
//! - [`config::ProviderConfig`] - connection settings from the environment

pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod storage;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

pub use auth::GoTrueClient;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use memory::{MemoryAuth, MemoryStorage, StorageOp};
pub use storage::{S3ClientConfig, S3Storage};
pub use types::{AuthChange, AuthEvent, Session, StoredObject, User};

/// Capacity of session-change broadcast channels
pub const AUTH_EVENT_CAPACITY: usize = 16;

/// Storage message for an upload to a name that is already taken
pub const RESOURCE_EXISTS: &str = "The resource already exists";

/// Authentication provider contract
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if any
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    /// Register a new account. Does not authenticate.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to session changes. Dropping the subscription unsubscribes.
    fn subscribe(&self) -> AuthSubscription;
}

/// Object storage provider contract, scoped to one namespace
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List every object in the namespace, in provider order
    async fn list(&self) -> Result<Vec<StoredObject>, ProviderError>;

    /// Public address of an object
    fn public_url(&self, name: &str) -> String;

    /// Store an object under `name`. An existing object is never replaced.
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), ProviderError>;

    /// Remove the named objects
    async fn remove(&self, names: &[String]) -> Result<(), ProviderError>;

    /// Fetch an object's bytes
    async fn download(&self, name: &str) -> Result<Bytes, ProviderError>;
}

/// Handle on a stream of session changes
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    pub fn new(receiver: broadcast::Receiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. Returns `None` once the provider is gone.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Session subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving events
    pub fn unsubscribe(self) {
        drop(self);
    }
}
