//! In-memory user store, for tests and `--ephemeral` runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use tracing::warn;

use crate::BoxFuture;
use crate::history::History;
use crate::secrets::SecretValue;

use super::{StoreError, UserStore};

#[derive(Debug)]
struct UserRecord {
    password: SecretValue,
    history: History,
}

/// A [`UserStore`] backed by a `HashMap<username, record>`.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UserRecord>> {
        self.users.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl UserStore for MemoryUserStore {
    fn create_user<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            match self.lock().entry(username.to_string()) {
                Entry::Occupied(_) => Err(StoreError::AlreadyExists(username.to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(UserRecord {
                        password: SecretValue::new(password),
                        history: History::new(),
                    });
                    Ok(())
                }
            }
        })
    }

    fn password_matches<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .get(username)
                .is_some_and(|record| record.password.expose() == password))
        })
    }

    fn load_history<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<History, StoreError>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .get(username)
                .map(|record| record.history.clone())
                .unwrap_or_default())
        })
    }

    fn save_history<'a>(
        &'a self,
        username: &'a str,
        history: &'a History,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            match self.lock().get_mut(username) {
                Some(record) => record.history = history.clone(),
                None => warn!(username = %username, "history save for unknown user ignored"),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Turn;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_and_validate() {
        let store = MemoryUserStore::new();
        store.create_user("alice", "p").await.unwrap();
        assert!(store.password_matches("alice", "p").await.unwrap());
        assert!(!store.password_matches("alice", "P").await.unwrap());
        assert!(!store.password_matches("bob", "p").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_keeps_original_password() {
        let store = MemoryUserStore::new();
        store.create_user("alice", "p").await.unwrap();
        let err = store.create_user("alice", "q").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref u) if u == "alice"));
        assert!(store.password_matches("alice", "p").await.unwrap());
        assert!(!store.password_matches("alice", "q").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_history_round_trip() {
        let store = MemoryUserStore::new();
        store.create_user("alice", "p").await.unwrap();
        let history: History = vec![Turn::new("سوال", ""), Turn::new("", "جواب")].into();
        store.save_history("alice", &history).await.unwrap();
        assert_eq!(store.load_history("alice").await.unwrap(), history);
    }

    #[tokio::test]
    async fn test_save_for_unknown_user_is_ignored() {
        let store = MemoryUserStore::new();
        let history: History = vec![Turn::new("q", "a")].into();
        store.save_history("ghost", &history).await.unwrap();
        assert!(store.load_history("ghost").await.unwrap().is_empty());
        assert!(store.is_empty());
    }
}
