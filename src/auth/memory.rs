//! An in-process identity provider for local development and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use tracing::info;

use super::{AuthBackend, AuthChange, AuthEvent, SessionStore, MIN_PASSWORD_LEN};
use crate::error::AuthError;
use crate::identity::{Identity, Session, UserId};

const TOKEN_LIFETIME: Duration = Duration::hours(1);

struct Account {
    id: UserId,
    password: String,
}

/// Accounts kept in process memory, with the managed backend's rules: unique
/// emails, a minimum password length and immediate sign-in after sign-up.
///
/// Passwords are compared as given; this backend never leaves the process.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    sessions: SessionStore,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `session` active, as if restored from storage.
    pub fn with_session(session: Session) -> Self {
        let auth = Self::default();
        auth.sessions.seed(Some(session));
        auth
    }

    /// Emits a token refresh for the active session, as the managed backend
    /// does shortly before the access token expires.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let mut session = self.sessions.current().ok_or(AuthError::SessionExpired)?;
        session.access_token = new_token(&session.identity.id);
        session.expires_at = OffsetDateTime::now_utc() + TOKEN_LIFETIME;
        self.sessions
            .set(AuthChange::TokenRefreshed, Some(session))
            .await;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn start_session(&self, id: UserId, email: &str) {
        let session = Session {
            access_token: new_token(&id),
            refresh_token: Some(format!("refresh-{id}")),
            expires_at: OffsetDateTime::now_utc() + TOKEN_LIFETIME,
            identity: Identity::new(id).with_email(email),
        };
        self.sessions.set(AuthChange::SignedIn, Some(session)).await;
    }
}

fn new_token(id: &UserId) -> String {
    format!(
        "access-{id}-{}",
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    )
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.current())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let id = {
            let mut accounts = self.lock();
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailTaken);
            }
            let id = UserId::new(format!("user-{}", accounts.len() + 1));
            accounts.insert(
                email.clone(),
                Account {
                    id: id.clone(),
                    password: password.to_string(),
                },
            );
            id
        };

        info!(user = %id, "registered account");
        self.start_session(id, &email).await;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let id = {
            let accounts = self.lock();
            match accounts.get(&email) {
                Some(account) if account.password == password => account.id.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        self.start_session(id, &email).await;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.sessions.current().is_some() {
            self.sessions.set(AuthChange::SignedOut, None).await;
        }
        Ok(())
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.sessions.subscribe()
    }
}
