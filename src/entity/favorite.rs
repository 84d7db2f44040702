//! Favorite entity model.

use sea_orm::entity::prelude::*;

/// A row of the `favorites` table.
///
/// # Database Schema
///
/// | Column       | Type                   | Description                          |
/// |--------------|------------------------|--------------------------------------|
/// | id           | BIGSERIAL (Primary Key)| Row id, used by the local API        |
/// | user_id      | TEXT NULL              | Owner; NULL for local API rows       |
/// | movie_id     | BIGINT                 | TMDB movie id                        |
/// | title        | TEXT NULL              | Snapshot of the movie title          |
/// | poster_path  | TEXT NULL              | Snapshot of the poster path          |
/// | release_date | TEXT NULL              | Snapshot of the release date         |
/// | vote_average | DOUBLE NULL            | Snapshot of the rating               |
/// | overview     | TEXT NULL              | Snapshot of the synopsis             |
/// | created_at   | TIMESTAMPTZ            | Insertion time, list order key       |
///
/// `(user_id, movie_id)` carries a unique index, so a user can hold a movie
/// at most once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "favorites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_id: Option<String>,
    pub movie_id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub poster_path: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub overview: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
