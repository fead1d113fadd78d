//! `TokenStore` backends.
//!
//! [`MemoryTokenStore`] keeps tokens in process memory and is what tests and
//! the FFI bridge use. [`FileTokenStore`] persists one file per key:
//!
//! ```text
//! <base_dir>/
//! └── auth_token      # raw token bytes, no trailing newline
//! ```
//!
//! The default base directory is `dirs::data_dir()/dawn-eats` (see
//! `ClientConfig::token_dir`).

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::session::{StoreError, TokenStore};

/// In-memory store. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(tokens.get(key).cloned())
    }

    fn save(&self, key: &str, token: &str) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        tokens.insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        tokens.remove(key);
        Ok(())
    }
}

/// Filesystem-backed store for device persistence.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    base: PathBuf,
}

impl FileTokenStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, token: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base)?;
        fs::write(self.path(key), token)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, TOKEN_KEY};

    #[test]
    fn memory_store_keys_are_independent() {
        let store = MemoryTokenStore::new();
        store.save("a", "1").unwrap();
        store.save("b", "2").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.load("a").unwrap(), None);
        assert_eq!(store.load("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("dawn-eats"));

        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
        store.save(TOKEN_KEY, "persisted").unwrap();
        assert_eq!(store.load(TOKEN_KEY).unwrap().as_deref(), Some("persisted"));
        assert!(dir.path().join("dawn-eats").join(TOKEN_KEY).exists());

        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
        store.remove(TOKEN_KEY).unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        Session::new(FileTokenStore::new(dir.path())).set("across restarts");

        let reopened = Session::new(FileTokenStore::new(dir.path()));
        assert_eq!(reopened.get().as_deref(), Some("across restarts"));
    }

    #[test]
    fn unreadable_token_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the token file should be makes the read fail.
        fs::create_dir_all(dir.path().join(TOKEN_KEY)).unwrap();
        let session = Session::new(FileTokenStore::new(dir.path()));
        assert_eq!(session.get(), None);
    }
}
