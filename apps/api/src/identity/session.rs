//! Current-session value for one browser, with push-style change delivery.
//!
//! A `SessionClient` starts out loading. The first delivery to subscribers is the
//! `restore` call that ends loading; after that, subscribers hear about each
//! sign-in and sign-out, in order, at most once per change.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::identity::{AuthError, IdentityProvider};
use crate::models::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<Session>,
    pub loading: bool,
}

/// Unsubscribe handle returned by [`SessionClient::subscribe`]. Dropping it
/// unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Clone)]
pub struct SessionClient {
    provider: Arc<dyn IdentityProvider>,
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionClient {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _rx) = watch::channel(SessionState {
            user: None,
            loading: true,
        });
        Self {
            provider,
            tx: Arc::new(tx),
        }
    }

    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn user(&self) -> Option<Session> {
        self.tx.borrow().user.clone()
    }

    /// Ends initial loading with whatever session was persisted for this browser.
    pub fn restore(&self, session: Option<Session>) {
        self.publish(session, false);
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_up(email, password).await?;
        self.publish(Some(session.clone()), false);
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_in(email, password).await?;
        self.publish(Some(session.clone()), false);
        Ok(session)
    }

    /// Local sign-out; the provider keeps no server-side session to revoke.
    pub fn sign_out(&self) {
        let loading = self.tx.borrow().loading;
        self.publish(None, loading);
    }

    /// Always stores the new value, but only wakes subscribers when the
    /// session (uid or tokens) or the loading flag actually changed.
    fn publish(&self, user: Option<Session>, loading: bool) {
        self.tx.send_if_modified(|state| {
            let next = SessionState { user, loading };
            let changed = state.user != next.user || state.loading != next.loading;
            *state = next;
            changed
        });
    }

    /// Registers `listener` for session changes. If loading has already
    /// finished, the current state is delivered first. Each delivery is awaited
    /// before the next one is taken.
    ///
    /// Changes published while a delivery is still running are coalesced: the
    /// listener next sees the latest state, not every intermediate one. Order is
    /// preserved and the final state is always delivered.
    pub fn subscribe<F, Fut>(&self, mut listener: F) -> Subscription
    where
        F: FnMut(SessionState) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        let task = tokio::spawn(async move {
            loop {
                let state = rx.borrow_and_update().clone();
                if state.loading {
                    debug!("Session still loading; waiting for first delivery");
                } else {
                    listener(state).await;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription { task }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    /// Accepts any password of six or more characters; uid is derived from email.
    pub struct StaticIdentity;

    pub fn session_for(email: &str) -> Session {
        Session {
            uid: format!("uid-{email}"),
            email: email.to_string(),
            id_token: "id-token".to_string(),
            refresh_token: "refresh".to_string(),
            signed_in_at: Utc::now(),
        }
    }

    #[async_trait]
    impl IdentityProvider for StaticIdentity {
        async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
            self.sign_in(email, password).await
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
            if password.len() < 6 {
                return Err(AuthError::Rejected("auth/weak-password".to_string()));
            }
            Ok(session_for(email))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{session_for, StaticIdentity};
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn client() -> SessionClient {
        SessionClient::new(Arc::new(StaticIdentity))
    }

    fn collector(client: &SessionClient) -> (Subscription, mpsc::UnboundedReceiver<SessionState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(move |state| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(state);
            }
        });
        (subscription, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<SessionState>) -> SessionState {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("subscription closed")
    }

    async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<SessionState>) {
        let outcome = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(outcome.is_err(), "unexpected delivery: {outcome:?}");
    }

    #[tokio::test]
    async fn test_starts_loading_with_no_user() {
        let state = client().current();
        assert!(state.loading);
        assert!(state.user.is_none());
    }

    #[tokio::test]
    async fn test_first_delivery_is_restore() {
        let client = client();
        let (_sub, mut rx) = collector(&client);
        assert_quiet(&mut rx).await;

        client.restore(Some(session_for("grad@example.com")));
        let state = next(&mut rx).await;
        assert!(!state.loading);
        assert_eq!(state.user.unwrap().email, "grad@example.com");
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_current_state() {
        let client = client();
        client.restore(None);

        let (_sub, mut rx) = collector(&client);
        let state = next(&mut rx).await;
        assert!(!state.loading);
        assert!(state.user.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_and_out_delivered_in_order() {
        let client = client();
        client.restore(None);
        let (_sub, mut rx) = collector(&client);
        next(&mut rx).await;

        client.sign_in("grad@example.com", "hunter22").await.unwrap();
        assert_eq!(next(&mut rx).await.user.unwrap().email, "grad@example.com");

        client.sign_out();
        assert!(next(&mut rx).await.user.is_none());
    }

    #[tokio::test]
    async fn test_no_delivery_without_change() {
        let client = client();
        client.restore(None);
        let (_sub, mut rx) = collector(&client);
        next(&mut rx).await;

        client.sign_out();
        client.restore(None);
        assert_quiet(&mut rx).await;
    }

    #[tokio::test]
    async fn test_fresh_tokens_for_same_user_are_delivered() {
        let client = client();
        client.restore(None);
        let (_sub, mut rx) = collector(&client);
        next(&mut rx).await;

        let first = client.sign_in("grad@example.com", "hunter22").await.unwrap();
        assert_eq!(next(&mut rx).await.user.unwrap(), first);

        let mut refreshed = first.clone();
        refreshed.id_token = "id-token-2".to_string();
        client.restore(Some(refreshed.clone()));
        assert_eq!(next(&mut rx).await.user.unwrap().id_token, "id-token-2");
    }

    #[tokio::test]
    async fn test_busy_listener_sees_latest_state() {
        let client = client();
        client.restore(None);
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = client.subscribe(move |state| {
            let tx = tx.clone();
            let mut release = release_rx.clone();
            async move {
                let _ = tx.send(state);
                let _ = release.wait_for(|go| *go).await;
            }
        });
        next(&mut rx).await;

        client.sign_in("first@example.com", "hunter22").await.unwrap();
        client.sign_in("second@example.com", "hunter22").await.unwrap();
        let _ = release_tx.send(true);

        let mut last = next(&mut rx).await;
        if last.user.as_ref().map(|u| u.email.as_str()) == Some("first@example.com") {
            last = next(&mut rx).await;
        }
        assert_eq!(last.user.unwrap().email, "second@example.com");
        assert_quiet(&mut rx).await;
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_state_alone() {
        let client = client();
        client.restore(None);

        let err = client.sign_in("grad@example.com", "123").await.unwrap_err();
        assert_eq!(err.code(), "auth/weak-password");
        assert!(client.user().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let client = client();
        client.restore(None);
        let (sub, mut rx) = collector(&client);
        next(&mut rx).await;

        drop(sub);
        client.sign_in("grad@example.com", "hunter22").await.unwrap();
        // The listener (and its sender) is dropped with the aborted task.
        let outcome = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(matches!(outcome, Ok(None)));
    }
}
