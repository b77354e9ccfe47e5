//! Session gate
//!
//! Holds the current session as observable state for as long as it is
//! mounted. Mounting subscribes to the provider's change stream first and
//! then fetches the current session, so a change that lands during the
//! fetch is applied after it and the newest state wins.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::{AuthProvider, Session};
use crate::gallery::lifetime::Lifetime;

pub struct SessionGate {
    state: watch::Receiver<Option<Session>>,
    listener: JoinHandle<()>,
    lifetime: Lifetime,
}

impl SessionGate {
    /// Fetch the current session and start following changes
    pub async fn mount(auth: Arc<dyn AuthProvider>) -> Self {
        let mut subscription = auth.subscribe();
        let (sender, state) = watch::channel(None);

        match auth.get_session().await {
            Ok(session) => {
                tracing::debug!("Initial session present: {}", session.is_some());
                sender.send_replace(session);
            }
            Err(e) => tracing::warn!("Failed to fetch current session: {}", e),
        }

        let lifetime = Lifetime::new();
        let guard = lifetime.clone();
        let listener = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if guard.is_ended() {
                    break;
                }
                tracing::debug!("Session change: {}", event.change.as_str());
                sender.send_replace(event.session);
            }
            tracing::debug!("Session listener stopped");
        });

        Self {
            state,
            listener,
            lifetime,
        }
    }

    /// Current session, if authenticated
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Observe session changes
    pub fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.state.clone()
    }

    /// Wait until presence matches `authenticated`, up to `timeout`.
    /// Returns whether it matched.
    pub async fn wait_for_presence(&self, authenticated: bool, timeout: Duration) -> bool {
        let mut state = self.state.clone();
        let wait = state.wait_for(|s| s.is_some() == authenticated);
        // Bind first: the matched `Ref` borrows `state`
        let matched = matches!(tokio::time::timeout(timeout, wait).await, Ok(Ok(_)));
        matched
    }

    /// Stop following changes. Drops the subscription.
    pub fn unmount(&self) {
        if !self.lifetime.is_ended() {
            self.lifetime.end();
            self.listener.abort();
            tracing::debug!("Session gate unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.lifetime.is_ended()
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryAuth;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mount_without_session() {
        let auth = Arc::new(MemoryAuth::new());
        let gate = SessionGate::mount(auth).await;
        assert!(!gate.is_authenticated());
    }

    #[tokio::test]
    async fn test_mount_picks_up_existing_session() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        auth.sign_in("a@example.com", "secret1").await.unwrap();

        let gate = SessionGate::mount(auth).await;
        assert!(gate.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_initial_fetch_leaves_session_unset() {
        let auth = Arc::new(MemoryAuth::new());
        auth.fail_get_session(Some("network down"));
        let gate = SessionGate::mount(auth).await;
        assert!(gate.session().is_none());
    }

    #[tokio::test]
    async fn test_follows_sign_in_and_sign_out() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        let gate = SessionGate::mount(auth.clone()).await;

        auth.sign_in("a@example.com", "secret1").await.unwrap();
        assert!(gate.wait_for_presence(true, WAIT).await);

        auth.sign_out().await.unwrap();
        assert!(gate.wait_for_presence(false, WAIT).await);
    }

    #[tokio::test]
    async fn test_follows_token_refresh() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        auth.sign_in("a@example.com", "secret1").await.unwrap();
        let gate = SessionGate::mount(auth.clone()).await;
        let mut watch = gate.watch();

        let refreshed = auth.refresh().unwrap();
        let observed = tokio::time::timeout(WAIT, watch.wait_for(|s| s.as_ref() == Some(&refreshed)))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(observed, Some(refreshed));
    }

    #[tokio::test]
    async fn test_unmount_unsubscribes() {
        let auth = Arc::new(MemoryAuth::new());
        let gate = SessionGate::mount(auth.clone()).await;
        assert_eq!(auth.subscriber_count(), 1);

        gate.unmount();
        tokio::time::timeout(WAIT, async {
            while auth.subscriber_count() != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(!gate.is_mounted());
    }

    #[tokio::test]
    async fn test_events_after_unmount_are_ignored() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        let gate = SessionGate::mount(auth.clone()).await;
        gate.unmount();

        auth.sign_in("a@example.com", "secret1").await.unwrap();
        assert!(!gate.wait_for_presence(true, Duration::from_millis(100)).await);
    }
}
