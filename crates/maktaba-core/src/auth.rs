//! Accounts and session identity.
//!
//! Every core operation takes an explicit [`SessionIdentity`]; there is no
//! ambient "logged in" state. The presentation layer obtains an
//! authenticated identity through [`Accounts::login`] and otherwise uses
//! [`SessionIdentity::Guest`].
//!
//! ```text
//! Guest ──login(username, password)──▶ Authenticated(username)
//!   │                                        │
//!   └── history lives in the session         └── history lives in the user store
//! ```
//!
//! Passwords are compared by exact equality. A failed login does not say
//! whether the username exists.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::secrets::SecretValue;
use crate::store::{StoreError, UserStore};

/// Whose history a request reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionIdentity {
    /// A logged-in user; history is persisted under this username.
    Authenticated(String),
    /// An anonymous session; history lasts only as long as the session.
    Guest,
}

impl SessionIdentity {
    pub fn authenticated(username: impl Into<String>) -> Self {
        Self::Authenticated(username.into())
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// The username, if authenticated.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Authenticated(username) => Some(username),
            Self::Guest => None,
        }
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated(username) => write!(f, "user:{username}"),
            Self::Guest => write!(f, "guest"),
        }
    }
}

/// A username and password pair supplied by the caller.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretValue,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretValue>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Errors from account operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username already exists")]
    AlreadyExists,

    #[error("username must not be empty")]
    EmptyUsername,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => Self::AlreadyExists,
            other => Self::Store(other),
        }
    }
}

/// Signup and login over a [`UserStore`].
#[derive(Clone)]
pub struct Accounts {
    users: Arc<dyn UserStore>,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create a new user with an empty history.
    ///
    /// A taken username yields [`AuthError::AlreadyExists`] and leaves the
    /// existing record untouched.
    pub async fn signup(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if credentials.username.trim().is_empty() {
            return Err(AuthError::EmptyUsername);
        }
        self.users
            .create_user(&credentials.username, credentials.password.expose())
            .await?;
        info!(username = %credentials.username, "account created");
        Ok(())
    }

    /// Whether the credentials match a stored user.
    pub async fn validate(&self, credentials: &Credentials) -> Result<bool, StoreError> {
        self.users
            .password_matches(&credentials.username, credentials.password.expose())
            .await
    }

    /// Log in, producing an authenticated identity on success.
    ///
    /// Returns `None` for an unknown user and a wrong password alike.
    pub async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<SessionIdentity>, StoreError> {
        if self.validate(credentials).await? {
            info!(username = %credentials.username, "login succeeded");
            Ok(Some(SessionIdentity::authenticated(&credentials.username)))
        } else {
            warn!("login failed: invalid credentials");
            Ok(None)
        }
    }
}
