use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AuthBackend, AuthEvent};
use crate::error::AuthError;
use crate::identity::Identity;

/// Process-wide source of truth for who is logged in.
///
/// Built once at startup with [`AuthContext::init`] and handed to every view
/// that gates content. The context owns exactly one listener on the backend's
/// event stream; it is the only writer of the current identity. Dropping the
/// context (or calling [`AuthContext::shutdown`]) stops the listener, after
/// which every [`Subscription`] winds down on its own.
///
/// # Usage
///
/// ```no_run
/// use std::sync::Arc;
/// use moviecorn::auth::{AuthContext, MemoryAuth};
///
/// # async fn example() -> Result<(), moviecorn::AuthError> {
/// let auth = AuthContext::init(Arc::new(MemoryAuth::new())).await;
///
/// let _subscription = auth.subscribe(|identity| {
///     println!("now signed in as {:?}", identity.map(|i| i.id));
/// });
///
/// auth.sign_up("ana@example.com", "hunter22").await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthContext {
    backend: Arc<dyn AuthBackend>,
    identity: watch::Receiver<Option<Identity>>,
    listener: JoinHandle<()>,
}

impl AuthContext {
    /// Queries the backend's current session once and starts listening for
    /// changes.
    ///
    /// A failing query resolves to "no identity" rather than an error, so
    /// the caller can always render once this returns.
    pub async fn init(backend: Arc<dyn AuthBackend>) -> Self {
        // Subscribe before querying so no change between the two is lost
        let events = backend.auth_events();

        let initial = match backend.current_session().await {
            Ok(session) => session.map(|s| s.identity),
            Err(e) => {
                warn!(error = %e, "could not read current session, starting signed out");
                None
            }
        };
        debug!(signed_in = initial.is_some(), "auth context initialized");

        let (sender, identity) = watch::channel(initial);
        let listener = tokio::spawn(listen(backend.clone(), events, sender));

        Self {
            backend,
            identity,
            listener,
        }
    }

    /// The identity as of the last processed backend event.
    pub fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.borrow().is_some()
    }

    /// A receiver of identity changes, for consumers that prefer to await.
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.clone()
    }

    /// Registers `callback` to run with the new identity after every session
    /// change (login, logout, token refresh).
    ///
    /// Callbacks run on a spawned task, so they arrive some time after the
    /// triggering call returns; bursts of changes may be coalesced into the
    /// latest value. Dropping the returned handle unregisters the callback.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<Identity>) + Send + 'static,
    {
        let mut receiver = self.identity.clone();
        receiver.mark_unchanged();

        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let identity = receiver.borrow_and_update().clone();
                callback(identity);
            }
        });

        Subscription { task }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.backend.sign_up(email, password).await.map_err(|e| {
            info!(error = %e, "sign-up rejected");
            e
        })
    }

    pub async fn log_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.backend.sign_in(email, password).await.map_err(|e| {
            info!(error = %e, "login rejected");
            e
        })
    }

    pub async fn log_out(&self) -> Result<(), AuthError> {
        self.backend.sign_out().await
    }

    /// Stops listening to the backend. Equivalent to dropping the context.
    pub fn shutdown(self) {}
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Handle to a callback registered with [`AuthContext::subscribe`].
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// Whether the callback can still fire.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn listen(
    backend: Arc<dyn AuthBackend>,
    mut events: broadcast::Receiver<AuthEvent>,
    sender: watch::Sender<Option<Identity>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(change = ?event.change, "session changed");
                sender.send_replace(event.session.map(|s| s.identity));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "auth events lagged, re-reading current session");
                match backend.current_session().await {
                    Ok(session) => {
                        sender.send_replace(session.map(|s| s.identity));
                    }
                    Err(e) => warn!(error = %e, "could not re-read current session"),
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::auth::MemoryAuth;
    use crate::identity::Session;

    const WAIT: Duration = Duration::from_secs(2);

    struct UnreachableBackend {
        events: broadcast::Sender<AuthEvent>,
    }

    #[async_trait]
    impl AuthBackend for UnreachableBackend {
        async fn current_session(&self) -> Result<Option<Session>, AuthError> {
            Err(AuthError::Backend("connection refused".into()))
        }

        async fn sign_up(&self, _: &str, _: &str) -> Result<(), AuthError> {
            Err(AuthError::Backend("connection refused".into()))
        }

        async fn sign_in(&self, _: &str, _: &str) -> Result<(), AuthError> {
            Err(AuthError::Backend("connection refused".into()))
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            Ok(())
        }

        fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }

    fn recorder(context: &AuthContext) -> (Subscription, mpsc::UnboundedReceiver<Option<Identity>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = context.subscribe(move |identity| {
            let _ = tx.send(identity);
        });
        (subscription, rx)
    }

    #[tokio::test]
    async fn unreachable_backend_starts_signed_out() {
        let (events, _) = broadcast::channel(4);
        let context = AuthContext::init(Arc::new(UnreachableBackend { events })).await;

        assert_eq!(context.current(), None);
        assert!(!context.is_signed_in());
    }

    #[tokio::test]
    async fn login_and_logout_reach_subscribers() {
        let backend = Arc::new(MemoryAuth::new());
        let context = AuthContext::init(backend).await;
        let (_subscription, mut updates) = recorder(&context);

        context.sign_up("ana@example.com", "secret1").await.unwrap();
        let signed_in = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
        assert_eq!(
            signed_in.and_then(|i| i.email),
            Some("ana@example.com".to_string())
        );

        context.log_out().await.unwrap();
        let signed_out = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
        assert_eq!(signed_out, None);
        assert_eq!(context.current(), None);
    }

    #[tokio::test]
    async fn token_refresh_notifies_with_the_same_identity() {
        let backend = Arc::new(MemoryAuth::new());
        let context = AuthContext::init(backend.clone()).await;
        context.sign_up("ana@example.com", "secret1").await.unwrap();

        let mut identity_rx = context.watch();
        timeout(WAIT, identity_rx.wait_for(|identity| identity.is_some()))
            .await
            .unwrap()
            .unwrap();
        let before = context.current();

        let (_subscription, mut updates) = recorder(&context);
        backend.refresh().await.unwrap();

        let after = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn wrong_password_and_taken_email_are_distinguishable() {
        let context = AuthContext::init(Arc::new(MemoryAuth::new())).await;
        context.sign_up("ana@example.com", "secret1").await.unwrap();

        let wrong_password = context
            .log_in("ana@example.com", "not-it")
            .await
            .unwrap_err();
        let taken = context
            .sign_up("ana@example.com", "secret2")
            .await
            .unwrap_err();

        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(taken, AuthError::EmailTaken);
        assert_ne!(wrong_password.user_message(), taken.user_message());
    }

    #[tokio::test]
    async fn short_password_is_rejected_as_weak() {
        let context = AuthContext::init(Arc::new(MemoryAuth::new())).await;

        let err = context.sign_up("ana@example.com", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
        assert!(!context.is_signed_in());
    }

    #[tokio::test]
    async fn shutdown_ends_subscriptions() {
        let context = AuthContext::init(Arc::new(MemoryAuth::new())).await;
        let (subscription, mut updates) = recorder(&context);

        context.shutdown();

        // The callback task ends once the listener's sender is gone
        assert_eq!(timeout(WAIT, updates.recv()).await.unwrap(), None);
        tokio::task::yield_now().await;
        assert!(!subscription.is_active());
    }
}
