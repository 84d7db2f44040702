//! Storage seams for favorites, profiles and persisted sessions.
//!
//! Views and state machines talk to these traits only. Three backends exist:
//! [`SeaOrmStore`] (direct database access through Sea-ORM),
//! [`crate::supabase::PostgrestStore`] (the managed backend's REST surface)
//! and [`MemoryStore`] (in-process, for local development and tests).

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::DataError;
use crate::identity::{Session, UserId};
use crate::model::{Favorite, NewFavorite, Profile, ProfileUpdate};

pub mod memory;
mod sea_orm_store;

pub use memory::MemoryStore;
pub use sea_orm_store::SeaOrmStore;

/// Per-user favorites keyed by `(owner, movie_id)`.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Point lookup of one favorite.
    async fn find_favorite(
        &self,
        owner: &UserId,
        movie_id: i64,
    ) -> Result<Option<Favorite>, DataError>;

    /// Inserts a favorite. Inserting a pair that already exists returns the
    /// stored row instead of creating a second one.
    async fn insert_favorite(&self, favorite: NewFavorite) -> Result<Favorite, DataError>;

    /// Deletes the favorite for the pair. Deleting a missing pair succeeds.
    async fn delete_favorite(&self, owner: &UserId, movie_id: i64) -> Result<(), DataError>;

    /// Every favorite of `owner`, newest first.
    async fn list_favorites(&self, owner: &UserId) -> Result<Vec<Favorite>, DataError>;
}

/// One profile row per user.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Absence of a row is `Ok(None)`, not an error.
    async fn find_profile(&self, id: &UserId) -> Result<Option<Profile>, DataError>;

    /// Creates the row on first edit, overwrites it afterwards.
    async fn upsert_profile(&self, update: ProfileUpdate) -> Result<Profile, DataError>;
}

/// Storage for a signed-in session between process runs.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Loads the session in slot `key`, ignoring rows past their expiry.
    async fn load_session(&self, key: &str) -> Result<Option<Session>, DataError>;

    /// Writes (or overwrites) slot `key`, valid until `expiry`.
    async fn save_session(
        &self,
        key: &str,
        session: &Session,
        expiry: OffsetDateTime,
    ) -> Result<(), DataError>;

    async fn delete_session(&self, key: &str) -> Result<(), DataError>;

    /// Removes every expired slot and returns how many were removed.
    async fn delete_expired_sessions(&self) -> Result<u64, DataError>;
}
