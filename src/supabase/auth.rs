use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{ErrorBody, SupabaseClient};
use crate::auth::{AuthBackend, AuthChange, AuthEvent, SessionStore};
use crate::error::AuthError;
use crate::identity::{Identity, Session, UserId};
use crate::store::SessionPersistence;

/// Default access token lifetime when the response carries no expiry.
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Email/password auth against the managed backend's GoTrue service.
///
/// The active session lives in a [`SessionStore`]; with
/// [`SupabaseAuth::with_persistence`] it is written through to storage and
/// [`SupabaseAuth::restore`] picks it up again on the next start, refreshing
/// the access token when it has expired.
pub struct SupabaseAuth {
    client: SupabaseClient,
    sessions: SessionStore,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            sessions: SessionStore::new(),
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn SessionPersistence>) -> Self {
        let key = self.client.storage_key();
        self.sessions = SessionStore::new().with_persistence(persistence, key);
        self
    }

    /// Loads a persisted session, refreshing it if the access token expired.
    ///
    /// Call once before building the [`crate::auth::AuthContext`]. A session
    /// that cannot be refreshed is discarded.
    pub async fn restore(&self) -> Option<Session> {
        let session = self.sessions.restore().await?;
        if !session.is_expired() {
            return Some(session);
        }

        match self.refresh_session().await {
            Ok(session) => Some(session),
            Err(e) => {
                info!(error = %e, "persisted session could not be refreshed");
                self.sessions.set(AuthChange::SignedOut, None).await;
                None
            }
        }
    }

    /// The bearer token for table requests, if a user is signed in.
    pub fn access_token(&self) -> Option<String> {
        self.sessions.current().map(|s| s.access_token)
    }

    /// Exchanges the refresh token for a new session and announces it.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .sessions
            .current()
            .and_then(|s| s.refresh_token)
            .ok_or(AuthError::SessionExpired)?;

        let response = self
            .client
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(transport_error)?;

        let session = parse_session(response).await?.ok_or(AuthError::SessionExpired)?;
        debug!(user = %session.identity.id, "session refreshed");
        self.sessions
            .set(AuthChange::TokenRefreshed, Some(session.clone()))
            .await;
        Ok(session)
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        match self.sessions.current() {
            Some(session) if session.is_expired() => match self.refresh_session().await {
                Ok(session) => Ok(Some(session)),
                Err(AuthError::SessionExpired) => {
                    info!(user = %session.identity.id, "session expired and could not be refreshed");
                    self.sessions.set(AuthChange::SignedOut, None).await;
                    Err(AuthError::SessionExpired)
                }
                Err(e) => Err(e),
            },
            session => Ok(session),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/signup", None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        // With email confirmation enabled the response has no session yet
        match parse_session(response).await? {
            Some(session) => {
                info!(user = %session.identity.id, "signed up");
                self.sessions.set(AuthChange::SignedIn, Some(session)).await;
            }
            None => info!("signed up, awaiting email confirmation"),
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        let session = parse_session(response)
            .await?
            .ok_or_else(|| AuthError::Backend("login response carried no session".into()))?;
        info!(user = %session.identity.id, "signed in");
        self.sessions.set(AuthChange::SignedIn, Some(session)).await;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(token) = self.access_token() else {
            return Ok(());
        };

        let result = self
            .client
            .request(Method::POST, "/auth/v1/logout", Some(&token))
            .send()
            .await;

        // The local session ends regardless of what the server says
        self.sessions.set(AuthChange::SignedOut, None).await;

        match result {
            Ok(response) => {
                let status = response.status();
                // An already-revoked token is as good as a logout
                if status.is_success()
                    || status == StatusCode::UNAUTHORIZED
                    || status == StatusCode::NOT_FOUND
                {
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(map_auth_error(status, &body))
                }
            }
            Err(e) => {
                warn!(error = %e, "logout request failed, session cleared locally");
                Err(transport_error(e))
            }
        }
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.sessions.subscribe()
    }
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<UserBody>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    email: Option<String>,
}

/// Reads a session out of a GoTrue response. `Ok(None)` is a success that
/// carried no session (sign-up pending confirmation).
async fn parse_session(response: reqwest::Response) -> Result<Option<Session>, AuthError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(map_auth_error(status, &body));
    }

    let parsed: SessionBody =
        serde_json::from_str(&body).map_err(|e| AuthError::Backend(e.to_string()))?;

    let (Some(access_token), Some(user)) = (parsed.access_token, parsed.user) else {
        return Ok(None);
    };

    let now = OffsetDateTime::now_utc();
    let expires_at = parsed
        .expires_at
        .and_then(|at| OffsetDateTime::from_unix_timestamp(at).ok())
        .unwrap_or_else(|| {
            now + Duration::seconds(parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))
        });

    Ok(Some(Session {
        access_token,
        refresh_token: parsed.refresh_token,
        expires_at,
        identity: Identity {
            id: UserId::new(user.id),
            email: user.email,
        },
    }))
}

fn transport_error(err: reqwest::Error) -> AuthError {
    AuthError::Backend(err.to_string())
}

/// Maps a GoTrue error response onto the fixed [`AuthError`] taxonomy.
fn map_auth_error(status: StatusCode, body: &str) -> AuthError {
    let parsed = ErrorBody::parse(body);
    let message = parsed.message().unwrap_or_default().to_string();
    let lowered = message.to_lowercase();

    match parsed.code() {
        Some("invalid_credentials" | "invalid_grant")
            if !lowered.contains("refresh token") =>
        {
            AuthError::InvalidCredentials
        }
        Some("user_already_exists" | "email_exists") => AuthError::EmailTaken,
        Some("weak_password") => AuthError::WeakPassword(message),
        Some("refresh_token_not_found" | "refresh_token_already_used" | "session_not_found")
        | Some("invalid_grant") => AuthError::SessionExpired,
        _ if lowered.contains("already registered") => AuthError::EmailTaken,
        _ if lowered.contains("password should") => AuthError::WeakPassword(message),
        _ if lowered.contains("invalid login credentials") => AuthError::InvalidCredentials,
        _ => AuthError::Backend(format!("{status}: {message}")),
    }
}
