//! Client for the managed backend (Supabase).
//!
//! [`SupabaseAuth`] speaks to the GoTrue auth endpoints under `/auth/v1`,
//! [`PostgrestStore`] to the table endpoints under `/rest/v1`. Both share one
//! [`SupabaseClient`], which carries the project URL, the anon key and the
//! underlying `reqwest` client.

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::Deserialize;

use crate::config::Config;

mod auth;
mod rest;

pub use auth::SupabaseAuth;
pub use rest::PostgrestStore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection details shared by the auth and table clients.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_http(http, url, anon_key))
    }

    pub fn with_http(
        http: reqwest::Client,
        url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.supabase_url, &config.supabase_anon_key)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The key under which a signed-in session is persisted, following the
    /// `sb-<project ref>-auth-token` convention of the official clients.
    pub fn storage_key(&self) -> String {
        let host = self
            .url
            .split("://")
            .nth(1)
            .unwrap_or(&self.url)
            .split(['.', ':', '/'])
            .next()
            .unwrap_or_default();
        format!("sb-{host}-auth-token")
    }

    /// A request to `path` carrying the anon key and the given bearer token
    /// (the anon key itself when no user is signed in).
    fn request(&self, method: reqwest::Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }
}

/// Error body shapes returned by GoTrue and PostgREST.
///
/// GoTrue has used both `{error, error_description}` and
/// `{code, error_code, msg}`; PostgREST uses `{code, message, details}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
    }
}
