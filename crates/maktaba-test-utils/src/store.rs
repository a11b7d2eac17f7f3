//! A user store wrapper that counts reads and writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use maktaba_core::store::{StoreError, UserStore};
use maktaba_core::{BoxFuture, History};

/// Delegates to an inner [`UserStore`] and counts history loads and saves.
pub struct CountingUserStore {
    inner: Arc<dyn UserStore>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl CountingUserStore {
    pub fn new(inner: Arc<dyn UserStore>) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl UserStore for CountingUserStore {
    fn create_user<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.inner.create_user(username, password)
    }

    fn password_matches<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        self.inner.password_matches(username, password)
    }

    fn load_history<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<History, StoreError>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_history(username)
    }

    fn save_history<'a>(
        &'a self,
        username: &'a str,
        history: &'a History,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_history(username, history)
    }
}
