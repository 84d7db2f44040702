//! Database entity models for the MovieCorn tables.
//!
//! These Sea-ORM entities map the `favorites` and `profiles` tables shared
//! with the managed backend, plus the `auth_session` table used to keep a
//! signed-in session across restarts.

/// Persisted auth sessions, keyed by storage key.
pub mod auth_session;

/// Per-user favorite movies with a snapshot of display fields.
pub mod favorite;

/// One profile row per user, created lazily on first edit.
pub mod profile;
