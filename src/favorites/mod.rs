//! Favorites as the views see them: the per-card toggle and the favorites
//! page.

pub mod collection;
pub mod optimistic;
pub mod toggle;

pub use collection::{FavoritesCollection, PAGE_SIZE};
pub use toggle::{FavoriteState, FavoriteToggle, ToggleOutcome};
