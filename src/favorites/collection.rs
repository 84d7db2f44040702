use std::sync::Arc;

use tracing::{debug, info};

use super::optimistic;
use crate::error::DataError;
use crate::identity::{Identity, UserId};
use crate::model::Favorite;
use crate::store::FavoriteStore;

/// Favorites shown per page.
pub const PAGE_SIZE: usize = 9;

/// The favorites page: the owner's full list, paged locally.
///
/// Pages are 1-based. With no favorites there is still a page 1, it is just
/// empty.
pub struct FavoritesCollection {
    store: Arc<dyn FavoriteStore>,
    owner: Option<UserId>,
    items: Vec<Favorite>,
    page: usize,
}

impl FavoritesCollection {
    pub fn new(store: Arc<dyn FavoriteStore>) -> Self {
        Self {
            store,
            owner: None,
            items: Vec::new(),
            page: 1,
        }
    }

    /// Fetches every favorite of `identity`, newest first, and returns to
    /// page 1. Without an identity the list is emptied and nothing is
    /// fetched.
    ///
    /// A failed fetch leaves the previous list in place.
    pub async fn load(&mut self, identity: Option<&Identity>) -> Result<(), DataError> {
        let Some(identity) = identity else {
            self.owner = None;
            self.items.clear();
            self.page = 1;
            return Ok(());
        };

        let items = self.store.list_favorites(&identity.id).await?;
        debug!(user = %identity.id, count = items.len(), "loaded favorites");

        self.owner = Some(identity.id.clone());
        self.items = items;
        self.page = 1;
        Ok(())
    }

    /// Removes `movie_id` from the list right away and deletes it remotely.
    ///
    /// If the delete fails the list is put back as it was. If it succeeds and
    /// the current page no longer exists, the view steps back one page.
    pub async fn remove(&mut self, movie_id: i64) -> Result<(), DataError> {
        let Some(owner) = self.owner.clone() else {
            return Ok(());
        };

        optimistic::apply(
            &mut self.items,
            |items| items.retain(|f| f.movie_id != movie_id),
            self.store.delete_favorite(&owner, movie_id),
        )
        .await?;

        info!(user = %owner, movie_id, "favorite removed");
        if self.page > self.total_pages() && self.page > 1 {
            self.page -= 1;
        }
        Ok(())
    }

    pub fn items(&self) -> &[Favorite] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// `ceil(len / PAGE_SIZE)`; zero for an empty list.
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(PAGE_SIZE)
    }

    /// Whether the pager is shown at all.
    pub fn has_pager(&self) -> bool {
        self.items.len() > PAGE_SIZE
    }

    /// The favorites on the current page.
    pub fn page_items(&self) -> &[Favorite] {
        let start = (self.page - 1) * PAGE_SIZE;
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + PAGE_SIZE).min(self.items.len());
        &self.items[start..end]
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    /// Jumps to `page`, clamped to the existing pages.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages().max(1));
    }
}
