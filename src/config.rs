//! Environment configuration.

use std::env;

use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 5000;

/// Runtime settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Catalog fetches degrade to empty results when unset.
    pub tmdb_api_key: Option<String>,
    /// Needed only by the local API server.
    pub database_url: Option<String>,
    pub port: u16,
}

impl Config {
    /// Loads `.env` if present and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let supabase_url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let supabase_anon_key =
            var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let tmdb_api_key = var("TMDB_API_KEY");
        if tmdb_api_key.is_none() {
            warn!("TMDB_API_KEY not set, catalog fetches will return no movies");
        }

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            tmdb_api_key,
            database_url: var("DATABASE_URL"),
            port,
        })
    }

    /// Returns the database URL or the error the server should exit with.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}
