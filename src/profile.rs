//! The profile page: show and rename the signed-in user.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DataError;
use crate::identity::Identity;
use crate::model::{Profile, ProfileUpdate};
use crate::store::ProfileStore;

/// Shown when the user never set a name.
pub const DEFAULT_DISPLAY_NAME: &str = "MovieCorn User";

pub struct ProfileEditor {
    store: Arc<dyn ProfileStore>,
    profile: Option<Profile>,
}

impl ProfileEditor {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            profile: None,
        }
    }

    /// Fetches the profile row of `identity`. A user who never saved a
    /// profile has none; that is not an error.
    pub async fn load(&mut self, identity: Option<&Identity>) -> Result<Option<&Profile>, DataError> {
        let Some(identity) = identity else {
            self.profile = None;
            return Ok(None);
        };

        self.profile = self.store.find_profile(&identity.id).await?;
        debug!(user = %identity.id, found = self.profile.is_some(), "loaded profile");
        Ok(self.profile.as_ref())
    }

    /// Saves a new display name, creating the row on first use.
    ///
    /// The local copy only changes once the write succeeded. The stored
    /// avatar is never part of the write, so it survives a rename even when
    /// nothing was loaded first.
    pub async fn save_name(&mut self, identity: &Identity, name: &str) -> Result<&Profile, DataError> {
        let name = name.trim();
        let saved = self
            .store
            .upsert_profile(ProfileUpdate::name(
                identity.id.clone(),
                (!name.is_empty()).then(|| name.to_string()),
            ))
            .await?;

        info!(user = %identity.id, "profile updated");
        Ok(self.profile.insert(saved))
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// The name to show in the header, falling back to the email and then
    /// to [`DEFAULT_DISPLAY_NAME`].
    pub fn display_name<'a>(&'a self, identity: &'a Identity) -> &'a str {
        self.profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .filter(|name| !name.is_empty())
            .or(identity.email.as_deref())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn first_save_creates_the_profile() {
        let store = Arc::new(MemoryStore::new());
        let mut editor = ProfileEditor::new(store.clone());
        let ana = Identity::new("user-a").with_email("ana@example.com");

        assert_eq!(editor.load(Some(&ana)).await.unwrap(), None);
        assert_eq!(editor.display_name(&ana), "ana@example.com");

        editor.save_name(&ana, "  Ana  ").await.unwrap();
        assert_eq!(editor.display_name(&ana), "Ana");

        let mut fresh = ProfileEditor::new(store);
        let loaded = fresh.load(Some(&ana)).await.unwrap().cloned();
        assert_eq!(loaded.and_then(|p| p.full_name), Some("Ana".to_string()));
    }

    #[tokio::test]
    async fn failed_save_keeps_the_old_name() {
        let store = Arc::new(MemoryStore::new());
        let mut editor = ProfileEditor::new(store.clone());
        let ana = Identity::new("user-a");
        editor.save_name(&ana, "Ana").await.unwrap();

        store.fail_writes(true);
        assert!(editor.save_name(&ana, "Someone Else").await.is_err());
        assert_eq!(editor.display_name(&ana), "Ana");
    }

    #[tokio::test]
    async fn rename_without_a_load_keeps_the_avatar() {
        let store = Arc::new(MemoryStore::new());
        let ana = Identity::new("user-a");
        store
            .upsert_profile(ProfileUpdate {
                id: ana.id.clone(),
                full_name: Some("Ana".into()),
                avatar_url: Some(Some("https://x/ana.png".into())),
            })
            .await
            .unwrap();

        let mut editor = ProfileEditor::new(store.clone());
        let saved = editor.save_name(&ana, "Ana Maria").await.unwrap().clone();

        assert_eq!(saved.full_name.as_deref(), Some("Ana Maria"));
        assert_eq!(saved.avatar_url.as_deref(), Some("https://x/ana.png"));
        let stored = store.find_profile(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.avatar_url.as_deref(), Some("https://x/ana.png"));
    }

    #[tokio::test]
    async fn signed_out_has_no_profile() {
        let store = Arc::new(MemoryStore::new());
        let mut editor = ProfileEditor::new(store.clone());

        assert_eq!(editor.load(None).await.unwrap(), None);
        assert_eq!(store.calls(), 0);
        assert_eq!(
            editor.display_name(&Identity::new("user-b")),
            DEFAULT_DISPLAY_NAME
        );
    }
}
