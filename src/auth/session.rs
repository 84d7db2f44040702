use std::sync::{Arc, RwLock};

use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{AuthChange, AuthEvent};
use crate::identity::Session;
use crate::store::SessionPersistence;

/// How long a persisted session stays restorable after its access token
/// expires; within this window the refresh token can still renew it.
pub const REFRESH_WINDOW: Duration = Duration::days(30);

const EVENT_CAPACITY: usize = 16;

/// Holds the session a backend currently considers active.
///
/// Every change goes through [`SessionStore::set`], which updates the
/// in-memory slot, writes it through to the optional [`SessionPersistence`]
/// and broadcasts an [`AuthEvent`]. Persistence failures are logged and do
/// not block the change: the process keeps working with an in-memory session.
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    persistence: Option<(Arc<dyn SessionPersistence>, String)>,
}

impl SessionStore {
    /// An in-memory session slot.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: RwLock::new(None),
            events,
            persistence: None,
        }
    }

    /// Writes every change through to `persistence` under `key`.
    pub fn with_persistence(
        mut self,
        persistence: Arc<dyn SessionPersistence>,
        key: impl Into<String>,
    ) -> Self {
        self.persistence = Some((persistence, key.into()));
        self
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Loads the persisted session into the slot without emitting an event.
    ///
    /// Returns the restored session, which may carry an expired access token
    /// that the caller is expected to refresh.
    pub async fn restore(&self) -> Option<Session> {
        let (persistence, key) = self.persistence.as_ref()?;

        match persistence.load_session(key).await {
            Ok(Some(session)) => {
                debug!(user = %session.identity.id, "restored persisted session");
                self.replace(Some(session.clone()));
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to load persisted session");
                None
            }
        }
    }

    /// Replaces the session and announces the change.
    pub async fn set(&self, change: AuthChange, session: Option<Session>) {
        self.replace(session.clone());

        if let Some((persistence, key)) = &self.persistence {
            let result = match &session {
                Some(session) => {
                    persistence
                        .save_session(key, session, session.expires_at + REFRESH_WINDOW)
                        .await
                }
                None => persistence.delete_session(key).await,
            };
            if let Err(e) = result {
                warn!(error = %e, "failed to persist session change");
            }
        }

        // No receivers just means nobody is listening yet
        let _ = self.events.send(AuthEvent { change, session });
    }

    /// Sets the slot without persisting or emitting an event. For backends
    /// starting from a known session.
    pub fn seed(&self, session: Option<Session>) {
        self.replace(session);
    }

    fn replace(&self, session: Option<Session>) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::identity::Identity;
    use crate::store::MemoryStore;

    fn session(user: &str) -> Session {
        Session {
            access_token: format!("token-{user}"),
            refresh_token: Some("refresh".into()),
            expires_at: datetime!(2100-01-01 0:00 UTC),
            identity: Identity::new(user),
        }
    }

    #[tokio::test]
    async fn set_broadcasts_and_persists() {
        let persistence = Arc::new(MemoryStore::new());
        let store = SessionStore::new().with_persistence(persistence.clone(), "slot");
        let mut events = store.subscribe();

        store.set(AuthChange::SignedIn, Some(session("a"))).await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.change, AuthChange::SignedIn);
        assert_eq!(store.current(), Some(session("a")));
        assert_eq!(
            persistence.load_session("slot").await.unwrap(),
            Some(session("a"))
        );

        store.set(AuthChange::SignedOut, None).await;
        assert_eq!(persistence.load_session("slot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_reads_the_persisted_slot() {
        let persistence = Arc::new(MemoryStore::new());
        persistence
            .save_session("slot", &session("a"), OffsetDateTime::now_utc() + Duration::days(1))
            .await
            .unwrap();

        let store = SessionStore::new().with_persistence(persistence, "slot");
        assert_eq!(store.restore().await, Some(session("a")));
        assert_eq!(store.current(), Some(session("a")));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_the_in_memory_session() {
        let persistence = Arc::new(MemoryStore::new());
        persistence.fail_writes(true);
        let store = SessionStore::new().with_persistence(persistence, "slot");

        store.set(AuthChange::SignedIn, Some(session("a"))).await;
        assert_eq!(store.current(), Some(session("a")));
    }
}
