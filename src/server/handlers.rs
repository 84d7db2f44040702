use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{AppError, AppState};
use crate::entity::favorite;
use crate::model::MovieSnapshot;

pub const LIVENESS_TEXT: &str = "MovieCorn backend is running";

/// A favorites row as the API returns it.
#[derive(Debug, Serialize)]
pub struct FavoriteBody {
    pub id: i64,
    pub user_id: Option<String>,
    pub movie_id: i64,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
    pub created_at: String,
}

impl From<favorite::Model> for FavoriteBody {
    fn from(row: favorite::Model) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            title: row.title,
            poster_path: row.poster_path,
            release_date: row.release_date,
            vote_average: row.vote_average,
            overview: row.overview,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddFavorite {
    pub movie_id: i64,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub rating: Option<f64>,
}

pub async fn index() -> &'static str {
    LIVENESS_TEXT
}

pub async fn list_favorites(
    State(state): State<AppState>,
) -> Result<Json<Vec<FavoriteBody>>, AppError> {
    let rows = state.store.list_all_favorite_rows().await?;
    Ok(Json(rows.into_iter().map(FavoriteBody::from).collect()))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    payload: Result<Json<AddFavorite>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    let row = state
        .store
        .insert_favorite_row(
            payload.movie_id,
            MovieSnapshot {
                title: payload.title,
                poster_path: payload.poster_path,
                vote_average: payload.rating,
                ..Default::default()
            },
        )
        .await?;
    info!(id = row.id, movie_id = row.movie_id, "favorite saved");

    Ok(Json(json!({
        "message": "Saved to favorites",
        "data": [FavoriteBody::from(row)],
    })))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let removed = state.store.delete_favorite_row(id).await?;
    info!(id, removed, "favorite delete");

    Ok(Json(json!({ "message": "Removed from favorites" })))
}
