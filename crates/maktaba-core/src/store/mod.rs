//! User store — durable user records and per-identity history access.
//!
//! Two layers:
//!
//! - [`UserStore`] — the durable key-value mapping `username → (password,
//!   history)`. Implemented by [`SqliteUserStore`] for production and
//!   [`MemoryUserStore`] for tests and throwaway runs.
//! - [`ConversationStore`] — what the assistant talks to. It routes
//!   [`SessionIdentity::Authenticated`] to the durable store and keeps the
//!   [`SessionIdentity::Guest`] history in memory for as long as the
//!   interactive session lives.
//!
//! Saves are whole-history overwrites with no concurrency control: two
//! in-flight requests for the same user race and the later save wins.

pub mod memory;
pub mod sqlite;

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::BoxFuture;
use crate::auth::SessionIdentity;
use crate::history::History;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

/// Errors from user store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user '{0}' already exists")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored history for '{username}' is corrupt: {source}")]
    CorruptHistory {
        username: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize history: {0}")]
    Serialize(serde_json::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

/// Durable storage of user records.
///
/// Implementations must be `Send + Sync`; methods return [`BoxFuture`] so
/// the store can sit behind `Arc<dyn UserStore>`.
pub trait UserStore: Send + Sync {
    /// Create a user with an empty history.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the username is taken; the
    /// existing record is left untouched.
    fn create_user<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Whether a record exists for `username` with exactly this password.
    ///
    /// An unknown user and a wrong password are indistinguishable.
    fn password_matches<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// The stored history for `username`; empty if the user has none or
    /// does not exist.
    fn load_history<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<History, StoreError>>;

    /// Overwrite the stored history for `username` with `history`.
    fn save_history<'a>(
        &'a self,
        username: &'a str,
        history: &'a History,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// History access keyed by session identity.
///
/// Create one per interactive session. The guest history dies with it;
/// authenticated histories live in the shared [`UserStore`].
pub struct ConversationStore {
    users: Arc<dyn UserStore>,
    guest: Mutex<History>,
}

impl ConversationStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            guest: Mutex::new(History::new()),
        }
    }

    /// The durable store behind this session.
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Load the history visible to `identity`.
    pub async fn load(&self, identity: &SessionIdentity) -> Result<History, StoreError> {
        match identity {
            SessionIdentity::Authenticated(username) => self.users.load_history(username).await,
            SessionIdentity::Guest => Ok(self.guest_history()),
        }
    }

    /// Replace the history visible to `identity`.
    pub async fn save(
        &self,
        identity: &SessionIdentity,
        history: &History,
    ) -> Result<(), StoreError> {
        match identity {
            SessionIdentity::Authenticated(username) => {
                debug!(username = %username, turns = history.len(), "saving user history");
                self.users.save_history(username, history).await
            }
            SessionIdentity::Guest => {
                debug!(turns = history.len(), "saving guest history");
                *self.guest.lock().unwrap_or_else(|p| p.into_inner()) = history.clone();
                Ok(())
            }
        }
    }

    fn guest_history(&self) -> History {
        self.guest
            .lock()
            .map(|h| h.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Turn;
    use pretty_assertions::assert_eq;

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(MemoryUserStore::new()))
    }

    #[tokio::test]
    async fn test_guest_starts_empty() {
        let store = store();
        assert!(store.load(&SessionIdentity::Guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_save_replaces_history() {
        let store = store();
        let first: History = vec![Turn::new("q1", "a1")].into();
        store.save(&SessionIdentity::Guest, &first).await.unwrap();
        assert_eq!(store.load(&SessionIdentity::Guest).await.unwrap(), first);

        let second: History = vec![Turn::new("q2", "a2")].into();
        store.save(&SessionIdentity::Guest, &second).await.unwrap();
        assert_eq!(store.load(&SessionIdentity::Guest).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_guest_history_is_per_session() {
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let a = ConversationStore::new(Arc::clone(&users));
        let b = ConversationStore::new(users);

        let history: History = vec![Turn::new("q", "a")].into();
        a.save(&SessionIdentity::Guest, &history).await.unwrap();
        assert!(b.load(&SessionIdentity::Guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authenticated_history_is_shared() {
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        users.create_user("alice", "p").await.unwrap();
        let a = ConversationStore::new(Arc::clone(&users));
        let b = ConversationStore::new(users);
        let alice = SessionIdentity::authenticated("alice");

        let history: History = vec![Turn::new("q", "a")].into();
        a.save(&alice, &history).await.unwrap();
        assert_eq!(b.load(&alice).await.unwrap(), history);
        // Guest slot is untouched by authenticated saves.
        assert!(a.load(&SessionIdentity::Guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_loads_empty() {
        let store = store();
        let history = store
            .load(&SessionIdentity::authenticated("nobody"))
            .await
            .unwrap();
        assert!(history.is_empty());
    }
}
