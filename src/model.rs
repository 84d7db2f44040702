//! Favorites and profile records as the rest of the crate sees them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::identity::UserId;

/// Display fields copied from a movie at the moment it is favorited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieSnapshot {
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
}

/// A persisted association between a user and a movie.
#[derive(Debug, Clone, PartialEq)]
pub struct Favorite {
    pub owner: UserId,
    pub movie_id: i64,
    pub snapshot: MovieSnapshot,
    pub created_at: OffsetDateTime,
}

impl Favorite {
    /// Release year for card captions, e.g. `"2010"` from `"2010-07-15"`.
    pub fn release_year(&self) -> Option<&str> {
        self.snapshot
            .release_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .filter(|year| !year.is_empty())
    }
}

/// Insert payload for a favorite.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFavorite {
    pub owner: UserId,
    pub movie_id: i64,
    pub snapshot: MovieSnapshot,
}

/// A user's profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: OffsetDateTime,
}

/// Upsert payload for a profile.
///
/// `full_name: None` is written as NULL. `avatar_url` is only written when
/// it is `Some`: `Some(None)` clears the stored avatar, `None` leaves it
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub id: UserId,
    pub full_name: Option<String>,
    pub avatar_url: Option<Option<String>>,
}

impl ProfileUpdate {
    /// A rename that keeps whatever avatar is stored.
    pub fn name(id: UserId, full_name: Option<String>) -> Self {
        Self {
            id,
            full_name,
            avatar_url: None,
        }
    }
}
