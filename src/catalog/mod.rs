//! Read-only movie metadata from TMDB.
//!
//! Responses are loosely typed upstream, so every [`Movie`] field is
//! optional and missing keys decode to `None`.

use serde::{Deserialize, Serialize};

use crate::model::MovieSnapshot;

mod tmdb;

pub use tmdb::TmdbClient;

/// Movies shown per grid page: three rows of six.
pub const GRID_SIZE: usize = 18;

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
const PLACEHOLDER_IMAGE: &str = "https://placehold.co/500x750?text=No+Image";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub runtime: Option<i64>,
    pub genres: Option<Vec<Genre>>,
}

impl Movie {
    /// The display fields copied into a favorite row.
    pub fn snapshot(&self) -> MovieSnapshot {
        MovieSnapshot {
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            release_date: self.release_date.clone(),
            vote_average: self.vote_average,
            overview: self.overview.clone(),
        }
    }

    pub fn poster_url(&self) -> String {
        image_url(self.poster_path.as_deref())
    }

    fn has_overview(&self) -> bool {
        self.overview.as_deref().is_some_and(|o| !o.trim().is_empty())
    }
}

/// One page of a list endpoint, already cut to [`GRID_SIZE`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    pub total_pages: u32,
    pub movies: Vec<Movie>,
}

/// Poster URL for `path`, or a placeholder image when there is none.
pub fn image_url(path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{IMAGE_BASE_URL}{path}"),
        _ => PLACEHOLDER_IMAGE.to_string(),
    }
}
