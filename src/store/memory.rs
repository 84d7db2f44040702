//! In-process store used for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{FavoriteStore, ProfileStore, SessionPersistence};
use crate::error::DataError;
use crate::identity::{Session, UserId};
use crate::model::{Favorite, NewFavorite, Profile, ProfileUpdate};

#[derive(Default)]
struct Tables {
    favorites: Vec<Favorite>,
    profiles: HashMap<UserId, Profile>,
    sessions: HashMap<String, (Session, OffsetDateTime)>,
}

/// A [`FavoriteStore`], [`ProfileStore`] and [`SessionPersistence`] kept in
/// memory.
///
/// Mirrors the database semantics the rest of the crate relies on: one
/// favorite per `(owner, movie_id)`, newest-first listing, expiry-filtered
/// session loads. Calls can be made to fail with [`MemoryStore::fail_writes`]
/// to exercise rollback paths, and every call is counted.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert, delete and upsert fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent lookup and listing fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total favorites rows across all owners.
    pub fn favorite_count(&self) -> usize {
        self.lock().favorites.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> Result<(), DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DataError::Backend("read failed".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> Result<(), DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DataError::Backend("write failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn find_favorite(
        &self,
        owner: &UserId,
        movie_id: i64,
    ) -> Result<Option<Favorite>, DataError> {
        self.read()?;
        Ok(self
            .lock()
            .favorites
            .iter()
            .find(|f| &f.owner == owner && f.movie_id == movie_id)
            .cloned())
    }

    async fn insert_favorite(&self, new: NewFavorite) -> Result<Favorite, DataError> {
        self.write()?;
        let mut tables = self.lock();

        if let Some(existing) = tables
            .favorites
            .iter()
            .find(|f| f.owner == new.owner && f.movie_id == new.movie_id)
        {
            return Ok(existing.clone());
        }

        let favorite = Favorite {
            owner: new.owner,
            movie_id: new.movie_id,
            snapshot: new.snapshot,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn delete_favorite(&self, owner: &UserId, movie_id: i64) -> Result<(), DataError> {
        self.write()?;
        self.lock()
            .favorites
            .retain(|f| !(&f.owner == owner && f.movie_id == movie_id));
        Ok(())
    }

    async fn list_favorites(&self, owner: &UserId) -> Result<Vec<Favorite>, DataError> {
        self.read()?;
        let tables = self.lock();
        // Insertion order is creation order, so reversing gives newest first
        // even when two rows share a timestamp.
        Ok(tables
            .favorites
            .iter()
            .rev()
            .filter(|f| &f.owner == owner)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, id: &UserId) -> Result<Option<Profile>, DataError> {
        self.read()?;
        Ok(self.lock().profiles.get(id).cloned())
    }

    async fn upsert_profile(&self, update: ProfileUpdate) -> Result<Profile, DataError> {
        self.write()?;
        let mut state = self.lock();
        let profile = state
            .profiles
            .entry(update.id.clone())
            .or_insert_with(|| Profile {
                id: update.id,
                full_name: None,
                avatar_url: None,
                updated_at: OffsetDateTime::now_utc(),
            });
        profile.full_name = update.full_name;
        if let Some(avatar_url) = update.avatar_url {
            profile.avatar_url = avatar_url;
        }
        profile.updated_at = OffsetDateTime::now_utc();
        Ok(profile.clone())
    }
}

#[async_trait]
impl SessionPersistence for MemoryStore {
    async fn load_session(&self, key: &str) -> Result<Option<Session>, DataError> {
        self.read()?;
        let now = OffsetDateTime::now_utc();
        Ok(self
            .lock()
            .sessions
            .get(key)
            .filter(|(_, expiry)| *expiry > now)
            .map(|(session, _)| session.clone()))
    }

    async fn save_session(
        &self,
        key: &str,
        session: &Session,
        expiry: OffsetDateTime,
    ) -> Result<(), DataError> {
        self.write()?;
        self.lock()
            .sessions
            .insert(key.to_string(), (session.clone(), expiry));
        Ok(())
    }

    async fn delete_session(&self, key: &str) -> Result<(), DataError> {
        self.write()?;
        self.lock().sessions.remove(key);
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> Result<u64, DataError> {
        self.write()?;
        let now = OffsetDateTime::now_utc();
        let mut tables = self.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, (_, expiry)| *expiry > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}
