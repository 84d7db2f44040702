//! The local favorites API.
//!
//! A small unauthenticated CRUD surface over the `favorites` table, kept
//! alongside the direct managed-backend calls. Rows created here carry no
//! owner and the listing is not filtered by user.
//!
//! | Method | Path                  | Response                      |
//! |--------|-----------------------|-------------------------------|
//! | GET    | `/`                   | liveness text                 |
//! | GET    | `/api/favorites`      | every row                     |
//! | POST   | `/api/favorites`      | `{ "message", "data": [row] }`|
//! | DELETE | `/api/favorites/{id}` | `{ "message" }`               |
//!
//! Storage failures answer `500 { "error" }`.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::store::SeaOrmStore;

mod error;
mod handlers;

pub use error::AppError;
pub use handlers::LIVENESS_TEXT;

#[derive(Clone)]
pub struct AppState {
    pub store: SeaOrmStore,
}

/// Builds the router with permissive CORS, ready to serve.
pub fn router(store: SeaOrmStore) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/favorites",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route("/api/favorites/{id}", delete(handlers::remove_favorite))
        .with_state(AppState { store })
        .layer(CorsLayer::permissive())
}
