//! SQLite user store.
//!
//! One row per user: `(username TEXT PRIMARY KEY, password TEXT, history
//! TEXT)`, where `history` is the JSON pair-array form of [`History`]. A NULL
//! or blank `history` column reads as an empty history.
//!
//! `rusqlite::Connection` is not `Sync`, so it lives behind
//! `Arc<Mutex<_>>` and every call runs on `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::BoxFuture;
use crate::history::History;

use super::{StoreError, UserStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password TEXT,
    history TEXT
);
"#;

/// A [`UserStore`] backed by a SQLite database file.
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteUserStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "opened user store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Get the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the connection on the blocking pool.
    async fn query<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let path = self.path.clone();

        spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poisoned| {
                warn!(path = %path.display(), "user store mutex poisoned, recovering");
                poisoned.into_inner()
            });
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl UserStore for SqliteUserStore {
    fn create_user<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let username = username.to_string();
        let password = password.to_string();
        Box::pin(async move {
            self.query(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO users (username, password, history) VALUES (?1, ?2, ?3)",
                    params![username, password, "[]"],
                )?;
                if inserted == 0 {
                    return Err(StoreError::AlreadyExists(username));
                }
                Ok(())
            })
            .await
        })
    }

    fn password_matches<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let username = username.to_string();
        let password = password.to_string();
        Box::pin(async move {
            self.query(move |conn| {
                let stored: Option<Option<String>> = conn
                    .query_row(
                        "SELECT password FROM users WHERE username = ?1",
                        params![username],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(matches!(stored, Some(Some(ref p)) if *p == password))
            })
            .await
        })
    }

    fn load_history<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<History, StoreError>> {
        let username = username.to_string();
        Box::pin(async move {
            self.query(move |conn| {
                let stored: Option<Option<String>> = conn
                    .query_row(
                        "SELECT history FROM users WHERE username = ?1",
                        params![username],
                        |row| row.get(0),
                    )
                    .optional()?;
                match stored.flatten() {
                    Some(json) => History::from_json(&json)
                        .map_err(|source| StoreError::CorruptHistory { username, source }),
                    None => Ok(History::new()),
                }
            })
            .await
        })
    }

    fn save_history<'a>(
        &'a self,
        username: &'a str,
        history: &'a History,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let username = username.to_string();
        let json = history.to_json().map_err(StoreError::Serialize);
        Box::pin(async move {
            let json = json?;
            self.query(move |conn| {
                let updated = conn.execute(
                    "UPDATE users SET history = ?1 WHERE username = ?2",
                    params![json, username],
                )?;
                if updated == 0 {
                    warn!(username = %username, "history save for unknown user ignored");
                }
                Ok(())
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Turn;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_store() -> (SqliteUserStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::open(&dir.path().join("user.db")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_create_user_starts_with_empty_history() {
        let (store, _dir) = temp_store();
        store.create_user("alice", "p").await.unwrap();
        assert!(store.load_history("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_user_keeps_original_password() {
        let (store, _dir) = temp_store();
        store.create_user("alice", "p").await.unwrap();
        let err = store.create_user("alice", "q").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref u) if u == "alice"));
        assert!(store.password_matches("alice", "p").await.unwrap());
        assert!(!store.password_matches("alice", "q").await.unwrap());
    }

    #[tokio::test]
    async fn test_password_matches_exactly() {
        let (store, _dir) = temp_store();
        store.create_user("alice", "Secret ").await.unwrap();
        assert!(store.password_matches("alice", "Secret ").await.unwrap());
        assert!(!store.password_matches("alice", "Secret").await.unwrap());
        assert!(!store.password_matches("alice", "secret ").await.unwrap());
        assert!(!store.password_matches("bob", "Secret ").await.unwrap());
    }

    #[tokio::test]
    async fn test_history_round_trip() {
        let (store, _dir) = temp_store();
        store.create_user("alice", "p").await.unwrap();

        let cases: Vec<History> = vec![
            History::new(),
            vec![Turn::new("only", "one")].into(),
            vec![
                Turn::new("زکوٰۃ کس پر فرض ہے؟", "صاحبِ نصاب پر"),
                Turn::new("", ""),
                Turn::new("it's \"quoted\", [bracketed]", "emoji 🕌 and\nnewlines"),
            ]
            .into(),
        ];

        for history in cases {
            store.save_history("alice", &history).await.unwrap();
            assert_eq!(store.load_history("alice").await.unwrap(), history);
        }
    }

    #[tokio::test]
    async fn test_unknown_user_has_empty_history() {
        let (store, _dir) = temp_store();
        assert!(store.load_history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_history_column_reads_empty() {
        let (store, _dir) = temp_store();
        store
            .query(|conn| {
                conn.execute(
                    "INSERT INTO users (username, password, history) VALUES ('legacy', 'p', NULL)",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO users (username, password, history) VALUES ('blank', 'p', '')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        assert!(store.load_history("legacy").await.unwrap().is_empty());
        assert!(store.load_history("blank").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_history_is_an_error() {
        let (store, _dir) = temp_store();
        store
            .query(|conn| {
                conn.execute(
                    "INSERT INTO users (username, password, history) VALUES ('broken', 'p', '{oops')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        let err = store.load_history("broken").await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptHistory { .. }));
    }

    #[tokio::test]
    async fn test_reads_python_era_json() {
        // Rows written with Python's json.dumps use ", " separators and
        // \u escapes for non-ASCII.
        let (store, _dir) = temp_store();
        store
            .query(|conn| {
                conn.execute(
                    r#"INSERT INTO users (username, password, history)
                       VALUES ('old', 'p', '[["q1", "a1"], ["\u0646\u0645\u0627\u0632", "a2"]]')"#,
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        let history = store.load_history("old").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[1].question(), "نماز");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user.db");
        let history: History = vec![Turn::new("q", "a")].into();
        {
            let store = SqliteUserStore::open(&path).unwrap();
            store.create_user("alice", "p").await.unwrap();
            store.save_history("alice", &history).await.unwrap();
        }
        let store = SqliteUserStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(store.password_matches("alice", "p").await.unwrap());
        assert_eq!(store.load_history("alice").await.unwrap(), history);
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let store = SqliteUserStore::open_in_memory().unwrap();
        store.create_user("alice", "p").await.unwrap();
        assert!(store.password_matches("alice", "p").await.unwrap());
    }
}
