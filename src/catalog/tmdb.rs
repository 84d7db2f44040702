use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Movie, MoviePage, GRID_SIZE};
use crate::error::CatalogError;

const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_LANGUAGE: &str = "id-ID";
const FALLBACK_LANGUAGE: &str = "en-US";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    results: Vec<Movie>,
}

/// TMDB REST client.
///
/// Without an API key every list comes back empty and every detail lookup
/// is [`CatalogError::NotFound`], so the rest of the app keeps working.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|key| !key.is_empty()),
            api_url: TMDB_API_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        })
    }

    /// Points the client at another server, e.g. a mock in tests.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// This week's trending movies.
    pub async fn trending(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.list("/trending/movie/week", page, &[]).await
    }

    pub async fn top_rated(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.list("/movie/top_rated", page, &[]).await
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(MoviePage::empty(page));
        }
        self.list("/search/movie", page, &[("query", query)]).await
    }

    /// Full details for one movie.
    ///
    /// When the localized overview is empty the English one is fetched in
    /// its place.
    pub async fn movie(&self, id: i64) -> Result<Movie, CatalogError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(movie_id = id, "TMDB_API_KEY missing, movie lookup skipped");
            return Err(CatalogError::NotFound(id));
        };

        let path = format!("/movie/{id}");
        let mut movie: Movie = self.get(&path, api_key, &self.language, &[], Some(id)).await?;

        if !movie.has_overview() && self.language != FALLBACK_LANGUAGE {
            debug!(movie_id = id, language = FALLBACK_LANGUAGE, "no localized overview, using fallback");
            let fallback: Movie = self.get(&path, api_key, FALLBACK_LANGUAGE, &[], Some(id)).await?;
            movie.overview = fallback.overview;
        }

        Ok(movie)
    }

    async fn list(
        &self,
        path: &str,
        page: u32,
        extra: &[(&str, &str)],
    ) -> Result<MoviePage, CatalogError> {
        let page = page.max(1);
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(path, "TMDB_API_KEY missing, returning an empty list");
            return Ok(MoviePage::empty(page));
        };

        let page_param = page.to_string();
        let mut params = vec![("page", page_param.as_str())];
        params.extend_from_slice(extra);

        let response: ListResponse = self.get(path, api_key, &self.language, &params, None).await?;
        let mut movies = response.results;
        movies.truncate(GRID_SIZE);

        debug!(path, page, count = movies.len(), "fetched movie list");
        Ok(MoviePage {
            page: response.page.unwrap_or(page),
            total_pages: response.total_pages.unwrap_or(page),
            movies,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &str,
        language: &str,
        params: &[(&str, &str)],
        movie_id: Option<i64>,
    ) -> Result<T, CatalogError> {
        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .query(&[("api_key", api_key), ("language", language)])
            .query(params)
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        let status = response.status();
        if let (StatusCode::NOT_FOUND, Some(id)) = (status, movie_id) {
            return Err(CatalogError::NotFound(id));
        }
        if !status.is_success() {
            return Err(CatalogError::Request(format!("{path} returned {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

impl MoviePage {
    fn empty(page: u32) -> Self {
        Self {
            page: page.max(1),
            total_pages: 0,
            movies: Vec::new(),
        }
    }
}
