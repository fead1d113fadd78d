//! Session token persistence.
//!
//! # Design
//! A `TokenStore` is a tiny key-value backend that can fail. `Session` binds
//! one store to the fixed token key and absorbs every storage failure: an
//! unreadable token is logged and reported as "not logged in", a failed
//! write or delete is logged and dropped. Callers of `Session` therefore
//! never see a storage error.
//!
//! `Session` is cheap to clone and clones share the underlying store, so the
//! dispatcher and the UI layer observe the same token.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::store::MemoryTokenStore;

/// Storage key the session token lives under.
pub const TOKEN_KEY: &str = "auth_token";

/// Failure inside a `TokenStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store lock poisoned")]
    Poisoned,
}

/// Durable key-value storage for string credentials.
pub trait TokenStore: Send + Sync + fmt::Debug {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, token: &str) -> Result<(), StoreError>;
    /// Removing a key that is not present succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The single session token, bound to a store and a key.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    key: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("key", &self.key)
            .finish()
    }
}

impl Session {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self::with_key(store, TOKEN_KEY)
    }

    pub fn with_key(store: impl TokenStore + 'static, key: &str) -> Self {
        Self {
            store: Arc::new(store),
            key: key.to_string(),
        }
    }

    /// A session backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    pub fn get(&self) -> Option<String> {
        match self.store.load(&self.key) {
            Ok(token) => token,
            Err(e) => {
                warn!("error getting auth token: {e}");
                None
            }
        }
    }

    /// Store `token`, replacing any previous one.
    pub fn set(&self, token: &str) {
        match self.store.save(&self.key, token) {
            Ok(()) => debug!("auth token stored under {}", self.key),
            Err(e) => warn!("error setting auth token: {e}"),
        }
    }

    pub fn clear(&self) {
        match self.store.remove(&self.key) {
            Ok(()) => debug!("auth token cleared from {}", self.key),
            Err(e) => warn!("error removing auth token: {e}"),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some_and(|token| !token.is_empty())
    }
}
