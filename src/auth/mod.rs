//! Authentication backends and the auth propagation layer.
//!
//! An [`AuthBackend`] performs sign-up, login and logout against some
//! identity provider and reports every session change as an [`AuthEvent`].
//! [`AuthContext`] turns those events into a single observable identity that
//! views read and subscribe to.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::AuthError;
use crate::identity::Session;

mod context;
pub mod memory;
mod session;

pub use context::{AuthContext, Subscription};
pub use memory::MemoryAuth;
pub use session::SessionStore;

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A session change reported by a backend. `session` is the state after the
/// change, `None` once signed out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub change: AuthChange,
    pub session: Option<Session>,
}

/// An identity provider.
///
/// Successful calls return `()`: the resulting session arrives through
/// [`AuthBackend::auth_events`], not as a return value.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The session the backend currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// A fresh receiver of session changes from this point on.
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Minimum password length accepted by the managed backend.
pub const MIN_PASSWORD_LEN: usize = 6;
