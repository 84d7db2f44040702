use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::DataError;
use crate::identity::Identity;
use crate::model::{MovieSnapshot, NewFavorite};
use crate::store::FavoriteStore;

/// What a card currently knows about one movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteState {
    /// Not resolved yet.
    Unknown,
    NotFavorite,
    Favorite,
    /// A remote write is in flight; `was_favorite` is the state it started
    /// from.
    Pending { was_favorite: bool },
}

impl FavoriteState {
    /// Whether the heart is filled. Unknown and pending states show the
    /// last settled value.
    pub fn is_favorite(self) -> bool {
        match self {
            FavoriteState::Favorite => true,
            FavoriteState::Pending { was_favorite } => was_favorite,
            FavoriteState::Unknown | FavoriteState::NotFavorite => false,
        }
    }
}

/// Result of a successful [`FavoriteToggle::toggle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// No identity; nothing was called. The view should send the user to
    /// the login page.
    LoginRequired,
    /// Another toggle on this card is still in flight; nothing was called.
    Busy,
    /// The card unmounted while the write was in flight. The write went
    /// through but the card was not updated with it.
    Discarded,
}

/// Per-card favorite state machine.
///
/// Calls take `&self`, so a card shared across tasks still lets only one
/// gesture through at a time: the move into `Pending` is an atomic
/// check-and-set on the state channel.
pub struct FavoriteToggle {
    store: Arc<dyn FavoriteStore>,
    movie_id: i64,
    snapshot: MovieSnapshot,
    state: watch::Sender<FavoriteState>,
    mounted: AtomicBool,
    /// Bumped by every toggle; a lookup that started under an older value
    /// is stale.
    generation: AtomicU64,
}

impl FavoriteToggle {
    pub fn new(store: Arc<dyn FavoriteStore>, movie_id: i64, snapshot: MovieSnapshot) -> Self {
        let (state, _) = watch::channel(FavoriteState::Unknown);
        Self {
            store,
            movie_id,
            snapshot,
            state,
            mounted: AtomicBool::new(true),
            generation: AtomicU64::new(0),
        }
    }

    pub fn movie_id(&self) -> i64 {
        self.movie_id
    }

    pub fn state(&self) -> FavoriteState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<FavoriteState> {
        self.state.subscribe()
    }

    /// Looks the movie up for `identity`. Without one the card settles on
    /// `NotFavorite` without a call; a failed lookup does the same.
    ///
    /// A lookup that finishes after a toggle started is ignored.
    pub async fn resolve(&self, identity: Option<&Identity>) -> FavoriteState {
        let generation = self.generation.load(Ordering::Acquire);
        let Some(identity) = identity else {
            self.settle(generation, FavoriteState::NotFavorite);
            return self.state();
        };

        let resolved = match self.store.find_favorite(&identity.id, self.movie_id).await {
            Ok(found) => {
                if found.is_some() {
                    FavoriteState::Favorite
                } else {
                    FavoriteState::NotFavorite
                }
            }
            Err(e) => {
                warn!(movie_id = self.movie_id, error = %e, "favorite lookup failed");
                FavoriteState::NotFavorite
            }
        };

        self.settle(generation, resolved);
        self.state()
    }

    /// Flips the favorite for `identity`.
    ///
    /// On failure the card returns to the state it started from and the
    /// error is handed back for the view to show.
    pub async fn toggle(&self, identity: Option<&Identity>) -> Result<ToggleOutcome, DataError> {
        let Some(identity) = identity else {
            debug!(movie_id = self.movie_id, "toggle without identity");
            return Ok(ToggleOutcome::LoginRequired);
        };

        let mut was_favorite = false;
        let started = self.state.send_if_modified(|state| match *state {
            FavoriteState::Pending { .. } => false,
            settled => {
                was_favorite = settled.is_favorite();
                *state = FavoriteState::Pending { was_favorite };
                true
            }
        });
        if !started {
            return Ok(ToggleOutcome::Busy);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        let mut guard = PendingGuard {
            state: &self.state,
            restore: settled_state(was_favorite),
        };

        let result = if was_favorite {
            self.store
                .delete_favorite(&identity.id, self.movie_id)
                .await
                .map(|()| ToggleOutcome::Removed)
        } else {
            self.store
                .insert_favorite(NewFavorite {
                    owner: identity.id.clone(),
                    movie_id: self.movie_id,
                    snapshot: self.snapshot.clone(),
                })
                .await
                .map(|_| ToggleOutcome::Added)
        };

        if !self.is_mounted() {
            debug!(movie_id = self.movie_id, "card unmounted, discarding toggle result");
            guard.disarm();
            return result.map(|_| ToggleOutcome::Discarded);
        }

        match result {
            Ok(outcome) => {
                guard.restore = settled_state(!was_favorite);
                debug!(movie_id = self.movie_id, ?outcome, "favorite toggled");
                Ok(outcome)
            }
            Err(e) => {
                warn!(movie_id = self.movie_id, error = %e, "favorite toggle failed");
                Err(e)
            }
        }
    }

    /// Marks the card as gone. Results that arrive afterwards are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    fn settle(&self, generation: u64, next: FavoriteState) {
        if !self.is_mounted() {
            return;
        }
        // Never clobber a toggle, in flight or finished, with a lookup result
        self.state.send_if_modified(|state| {
            let stale = self.generation.load(Ordering::Acquire) != generation;
            if stale || matches!(state, FavoriteState::Pending { .. }) || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

fn settled_state(favorite: bool) -> FavoriteState {
    if favorite {
        FavoriteState::Favorite
    } else {
        FavoriteState::NotFavorite
    }
}

/// Leaves `Pending` when the toggle finishes or its future is dropped.
struct PendingGuard<'a> {
    state: &'a watch::Sender<FavoriteState>,
    restore: FavoriteState,
}

impl PendingGuard<'_> {
    fn disarm(&mut self) {
        self.restore = FavoriteState::Unknown;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let restore = self.restore;
        self.state.send_modify(|state| *state = restore);
    }
}

#[cfg(test)]
mod tests {
    use std::future::{poll_fn, Future};
    use std::task::Poll;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::identity::UserId;
    use crate::model::Favorite;
    use crate::store::MemoryStore;

    fn inception() -> MovieSnapshot {
        MovieSnapshot {
            title: Some("Inception".into()),
            ..Default::default()
        }
    }

    fn ana() -> Identity {
        Identity::new("user-a")
    }

    #[tokio::test]
    async fn no_identity_resolves_without_a_call() {
        let store = Arc::new(MemoryStore::new());
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());

        assert_eq!(toggle.resolve(None).await, FavoriteState::NotFavorite);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn toggle_without_identity_asks_for_login() {
        let store = Arc::new(MemoryStore::new());
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());
        toggle.resolve(None).await;

        assert_eq!(toggle.toggle(None).await, Ok(ToggleOutcome::LoginRequired));
        assert_eq!(toggle.state(), FavoriteState::NotFavorite);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn add_then_remove_leaves_no_row() {
        let store = Arc::new(MemoryStore::new());
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());
        let ana = ana();
        toggle.resolve(Some(&ana)).await;

        assert_eq!(toggle.toggle(Some(&ana)).await, Ok(ToggleOutcome::Added));
        assert_eq!(toggle.state(), FavoriteState::Favorite);
        assert_eq!(store.favorite_count(), 1);

        assert_eq!(toggle.toggle(Some(&ana)).await, Ok(ToggleOutcome::Removed));
        assert_eq!(toggle.state(), FavoriteState::NotFavorite);
        assert_eq!(store.favorite_count(), 0);
    }

    #[tokio::test]
    async fn failed_write_returns_to_the_previous_state() {
        let store = Arc::new(MemoryStore::new());
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());
        let ana = ana();
        toggle.resolve(Some(&ana)).await;

        store.fail_writes(true);
        let err = toggle.toggle(Some(&ana)).await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "Failed to save. Check your internet connection."
        );
        assert_eq!(toggle.state(), FavoriteState::NotFavorite);
    }

    #[tokio::test]
    async fn failed_lookup_settles_on_not_favorite() {
        let store = Arc::new(MemoryStore::new());
        store.fail_reads(true);
        let toggle = FavoriteToggle::new(store, 27205, inception());

        assert_eq!(toggle.resolve(Some(&ana())).await, FavoriteState::NotFavorite);
    }

    /// Blocks every insert until released.
    struct GatedStore {
        inner: MemoryStore,
        gate: Notify,
    }

    #[async_trait]
    impl FavoriteStore for GatedStore {
        async fn find_favorite(
            &self,
            owner: &UserId,
            movie_id: i64,
        ) -> Result<Option<Favorite>, DataError> {
            self.inner.find_favorite(owner, movie_id).await
        }

        async fn insert_favorite(&self, favorite: NewFavorite) -> Result<Favorite, DataError> {
            self.gate.notified().await;
            self.inner.insert_favorite(favorite).await
        }

        async fn delete_favorite(&self, owner: &UserId, movie_id: i64) -> Result<(), DataError> {
            self.inner.delete_favorite(owner, movie_id).await
        }

        async fn list_favorites(&self, owner: &UserId) -> Result<Vec<Favorite>, DataError> {
            self.inner.list_favorites(owner).await
        }
    }

    #[tokio::test]
    async fn second_gesture_while_pending_is_busy() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: Notify::new(),
        });
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());
        let ana = ana();

        let mut first = Box::pin(toggle.toggle(Some(&ana)));
        // Drive the first toggle until it parks on the gate
        poll_fn(|cx| {
            assert!(first.as_mut().poll(cx).is_pending());
            Poll::Ready(())
        })
        .await;
        assert_eq!(toggle.state(), FavoriteState::Pending { was_favorite: false });

        assert_eq!(toggle.toggle(Some(&ana)).await, Ok(ToggleOutcome::Busy));

        store.gate.notify_one();
        assert_eq!(first.await, Ok(ToggleOutcome::Added));
        assert_eq!(store.inner.favorite_count(), 1);
    }

    #[tokio::test]
    async fn result_after_unmount_is_discarded() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: Notify::new(),
        });
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());
        let ana = ana();
        let states = toggle.watch();

        let mut pending = Box::pin(toggle.toggle(Some(&ana)));
        poll_fn(|cx| {
            assert!(pending.as_mut().poll(cx).is_pending());
            Poll::Ready(())
        })
        .await;

        toggle.unmount();
        store.gate.notify_one();

        assert_eq!(pending.await, Ok(ToggleOutcome::Discarded));
        assert_ne!(*states.borrow(), FavoriteState::Favorite);
    }

    /// Answers every lookup with what the table held when it was asked, but
    /// only once released.
    struct SlowLookup {
        inner: MemoryStore,
        gate: Notify,
    }

    #[async_trait]
    impl FavoriteStore for SlowLookup {
        async fn find_favorite(
            &self,
            owner: &UserId,
            movie_id: i64,
        ) -> Result<Option<Favorite>, DataError> {
            let found = self.inner.find_favorite(owner, movie_id).await;
            self.gate.notified().await;
            found
        }

        async fn insert_favorite(&self, favorite: NewFavorite) -> Result<Favorite, DataError> {
            self.inner.insert_favorite(favorite).await
        }

        async fn delete_favorite(&self, owner: &UserId, movie_id: i64) -> Result<(), DataError> {
            self.inner.delete_favorite(owner, movie_id).await
        }

        async fn list_favorites(&self, owner: &UserId) -> Result<Vec<Favorite>, DataError> {
            self.inner.list_favorites(owner).await
        }
    }

    #[tokio::test]
    async fn late_lookup_does_not_undo_a_finished_toggle() {
        let store = Arc::new(SlowLookup {
            inner: MemoryStore::new(),
            gate: Notify::new(),
        });
        let toggle = FavoriteToggle::new(store.clone(), 27205, inception());
        let ana = ana();

        let mut lookup = Box::pin(toggle.resolve(Some(&ana)));
        poll_fn(|cx| {
            assert!(lookup.as_mut().poll(cx).is_pending());
            Poll::Ready(())
        })
        .await;

        assert_eq!(toggle.toggle(Some(&ana)).await, Ok(ToggleOutcome::Added));

        // The lookup saw an empty table and answers NotFavorite
        store.gate.notify_one();
        assert_eq!(lookup.await, FavoriteState::Favorite);
        assert_eq!(toggle.state(), FavoriteState::Favorite);
        assert_eq!(store.inner.favorite_count(), 1);

        assert_eq!(toggle.toggle(Some(&ana)).await, Ok(ToggleOutcome::Removed));
        assert_eq!(store.inner.favorite_count(), 0);
    }

    #[tokio::test]
    async fn dropped_toggle_does_not_stay_pending() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: Notify::new(),
        });
        let toggle = FavoriteToggle::new(store, 27205, inception());
        let ana = ana();

        let mut pending = Box::pin(toggle.toggle(Some(&ana)));
        poll_fn(|cx| {
            assert!(pending.as_mut().poll(cx).is_pending());
            Poll::Ready(())
        })
        .await;
        drop(pending);

        assert_eq!(toggle.state(), FavoriteState::NotFavorite);
    }
}
