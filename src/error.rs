//! Error types for the auth, data, catalog and configuration layers.
//!
//! Each error carries a fixed user-facing message through `user_message`, so
//! views can show an inline notice without inspecting backend details.

use thiserror::Error;

/// Rejections from the authentication backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("session expired")]
    SessionExpired,

    #[error("auth backend error: {0}")]
    Backend(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Login failed. Check your email and password.",
            AuthError::EmailTaken => "This email is already registered. Log in instead.",
            AuthError::WeakPassword(_) => "Password is too weak. Use at least 6 characters.",
            AuthError::SessionExpired => "Your session has expired. Please log in again.",
            AuthError::Backend(_) => "Login failed. Check your internet connection.",
        }
    }
}

/// Failures reading or writing favorites, profiles or persisted sessions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl DataError {
    pub fn user_message(&self) -> &'static str {
        "Failed to save. Check your internet connection."
    }
}

impl From<sea_orm::DbErr> for DataError {
    fn from(err: sea_orm::DbErr) -> Self {
        DataError::Backend(err.to_string())
    }
}

/// Failures from the movie catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("movie {0} not found")]
    NotFound(i64),

    #[error("catalog request failed: {0}")]
    Request(String),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

impl CatalogError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "Movie not found.",
            CatalogError::Request(_) | CatalogError::Decode(_) => "Failed to load movies.",
        }
    }
}

/// Startup configuration problems. These are the only fatal errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_password_and_duplicate_email_read_differently() {
        assert_ne!(
            AuthError::InvalidCredentials.user_message(),
            AuthError::EmailTaken.user_message()
        );
    }

    #[test]
    fn data_errors_share_the_generic_message() {
        assert_eq!(
            DataError::Backend("timeout".into()).user_message(),
            DataError::Decode("bad row".into()).user_message()
        );
    }
}
