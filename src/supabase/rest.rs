use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use super::{ErrorBody, SupabaseAuth, SupabaseClient};
use crate::auth::AuthBackend;
use crate::error::DataError;
use crate::identity::UserId;
use crate::model::{Favorite, MovieSnapshot, NewFavorite, Profile, ProfileUpdate};
use crate::store::{FavoriteStore, ProfileStore};

const FAVORITES: &str = "/rest/v1/favorites";
const PROFILES: &str = "/rest/v1/profiles";

/// [`FavoriteStore`] and [`ProfileStore`] over the managed backend's
/// PostgREST endpoints.
///
/// Requests carry the signed-in user's access token when a [`SupabaseAuth`]
/// is attached, so row-level security applies as it would for the browser
/// client.
#[derive(Clone)]
pub struct PostgrestStore {
    client: SupabaseClient,
    auth: Option<Arc<SupabaseAuth>>,
}

impl PostgrestStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client, auth: None }
    }

    pub fn with_auth(mut self, auth: Arc<SupabaseAuth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Builds a table request. An expired access token is refreshed first;
    /// one that cannot be refreshed is dropped and the anon key is sent.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = match &self.auth {
            Some(auth) => auth
                .current_session()
                .await
                .ok()
                .flatten()
                .map(|session| session.access_token),
            None => None,
        };
        self.client.request(method, path, token.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    user_id: Option<String>,
    movie_id: i64,
    title: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    overview: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl FavoriteRow {
    fn into_favorite(self) -> Result<Favorite, DataError> {
        let owner = self
            .user_id
            .ok_or_else(|| DataError::Decode(format!("favorite {} has no owner", self.movie_id)))?;
        Ok(Favorite {
            owner: UserId::new(owner),
            movie_id: self.movie_id,
            snapshot: MovieSnapshot {
                title: self.title,
                poster_path: self.poster_path,
                release_date: self.release_date,
                vote_average: self.vote_average,
                overview: self.overview,
            },
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
struct FavoriteInsert<'a> {
    user_id: &'a str,
    movie_id: i64,
    title: Option<&'a str>,
    poster_path: Option<&'a str>,
    release_date: Option<&'a str>,
    vote_average: Option<f64>,
    overview: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: UserId::new(row.id),
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileUpsert<'a> {
    id: &'a str,
    full_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<Option<&'a str>>,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

async fn send(request: RequestBuilder) -> Result<Response, DataError> {
    let response = request
        .send()
        .await
        .map_err(|e| DataError::Backend(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = ErrorBody::parse(&body)
        .message()
        .map(str::to_string)
        .unwrap_or(body);
    Err(DataError::Backend(format!("{status}: {message}")))
}

async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>, DataError> {
    send(request)
        .await?
        .json()
        .await
        .map_err(|e| DataError::Decode(e.to_string()))
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl FavoriteStore for PostgrestStore {
    async fn find_favorite(
        &self,
        owner: &UserId,
        movie_id: i64,
    ) -> Result<Option<Favorite>, DataError> {
        let found: Vec<FavoriteRow> = rows(self.request(Method::GET, FAVORITES).await.query(&[
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("movie_id", eq(movie_id)),
            ("limit", "1".to_string()),
        ]))
        .await?;

        found.into_iter().next().map(FavoriteRow::into_favorite).transpose()
    }

    async fn insert_favorite(&self, favorite: NewFavorite) -> Result<Favorite, DataError> {
        let snapshot = &favorite.snapshot;
        let body = FavoriteInsert {
            user_id: favorite.owner.as_str(),
            movie_id: favorite.movie_id,
            title: snapshot.title.as_deref(),
            poster_path: snapshot.poster_path.as_deref(),
            release_date: snapshot.release_date.as_deref(),
            vote_average: snapshot.vote_average,
            overview: snapshot.overview.as_deref(),
        };

        let inserted: Vec<FavoriteRow> = rows(
            self.request(Method::POST, FAVORITES)
                .await
                .query(&[("on_conflict", "user_id,movie_id")])
                .header("Prefer", "return=representation,resolution=ignore-duplicates")
                .json(&[body]),
        )
        .await?;

        if let Some(row) = inserted.into_iter().next() {
            return row.into_favorite();
        }

        // An ignored duplicate comes back empty; hand back the stored row
        debug!(user = %favorite.owner, movie_id = favorite.movie_id, "favorite already stored");
        self.find_favorite(&favorite.owner, favorite.movie_id)
            .await?
            .ok_or_else(|| {
                DataError::Backend(format!(
                    "favorite {} was neither inserted nor found",
                    favorite.movie_id
                ))
            })
    }

    async fn delete_favorite(&self, owner: &UserId, movie_id: i64) -> Result<(), DataError> {
        send(
            self.request(Method::DELETE, FAVORITES)
                .await
                .query(&[("user_id", eq(owner)), ("movie_id", eq(movie_id))]),
        )
        .await?;
        Ok(())
    }

    async fn list_favorites(&self, owner: &UserId) -> Result<Vec<Favorite>, DataError> {
        let found: Vec<FavoriteRow> = rows(self.request(Method::GET, FAVORITES).await.query(&[
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("order", "created_at.desc".to_string()),
        ]))
        .await?;

        found.into_iter().map(FavoriteRow::into_favorite).collect()
    }
}

#[async_trait]
impl ProfileStore for PostgrestStore {
    async fn find_profile(&self, id: &UserId) -> Result<Option<Profile>, DataError> {
        let found: Vec<ProfileRow> = rows(self.request(Method::GET, PROFILES).await.query(&[
            ("select", "*".to_string()),
            ("id", eq(id)),
            ("limit", "1".to_string()),
        ]))
        .await?;

        Ok(found.into_iter().next().map(Profile::from))
    }

    async fn upsert_profile(&self, update: ProfileUpdate) -> Result<Profile, DataError> {
        let body = ProfileUpsert {
            id: update.id.as_str(),
            full_name: update.full_name.as_deref(),
            avatar_url: update.avatar_url.as_ref().map(Option::as_deref),
            updated_at: OffsetDateTime::now_utc(),
        };

        let stored: Vec<ProfileRow> = rows(
            self.request(Method::POST, PROFILES)
                .await
                .header("Prefer", "return=representation,resolution=merge-duplicates")
                .json(&[body]),
        )
        .await?;

        stored
            .into_iter()
            .next()
            .map(Profile::from)
            .ok_or_else(|| DataError::Backend(format!("profile {} was not stored", update.id)))
    }
}
