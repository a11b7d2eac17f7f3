//! Assistant test fixture.
//!
//! [`TestSession`] wires a [`ScriptedProvider`] and a SQLite user store in a
//! temporary directory into an [`Assistant`], so orchestrator tests only
//! script answers and make assertions.

use std::path::PathBuf;
use std::sync::Arc;

use maktaba_core::{
    Accounts, Assistant, ContextBudget, ConversationStore, Credentials, SessionIdentity,
    SqliteUserStore,
};
use tempfile::TempDir;

use crate::provider::ScriptedProvider;
use crate::store::CountingUserStore;

pub const TEST_SYSTEM_PROMPT: &str = "Answer from the test library only.";
pub const TEST_DOMAIN: &str = "shamilaurdu.com";
pub const TEST_MODEL: &str = "compound-beta-mini";

/// A test-scoped assistant with its own database file.
///
/// The temp directory is deleted when this value is dropped, even on panic.
pub struct TestSession {
    pub provider: Arc<ScriptedProvider>,
    pub users: Arc<CountingUserStore>,
    pub store: ConversationStore,
    pub assistant: Assistant,
    pub db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestSession {
    /// A session with the default 1500/300 budget.
    pub fn new() -> Self {
        Self::with_budget(ContextBudget::default())
    }

    pub fn with_budget(budget: ContextBudget) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("user.db");
        let sqlite = SqliteUserStore::open(&db_path).expect("failed to open test database");
        let users = Arc::new(CountingUserStore::new(Arc::new(sqlite)));

        let provider = Arc::new(ScriptedProvider::new());
        let assistant = Assistant::new(provider.clone(), TEST_MODEL, TEST_DOMAIN, budget)
            .with_system_prompt(TEST_SYSTEM_PROMPT);
        let store = ConversationStore::new(users.clone());

        Self {
            provider,
            users,
            store,
            assistant,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.users.clone())
    }

    /// Sign up and log in `username`, returning its identity.
    pub async fn login_as(&self, username: &str) -> SessionIdentity {
        let creds = Credentials::new(username, "password");
        let accounts = self.accounts();
        accounts.signup(&creds).await.expect("signup failed");
        accounts
            .login(&creds)
            .await
            .expect("login query failed")
            .expect("login rejected")
    }

    /// A second interactive session over the same user store.
    pub fn another_session(&self) -> ConversationStore {
        ConversationStore::new(self.users.clone())
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}
