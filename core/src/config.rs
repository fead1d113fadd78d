//! Client configuration: `dawn.toml` plus environment overrides.
//!
//! ```toml
//! base_url = "https://api.dawneats.example/api/v1"
//! token_key = "auth_token"
//! data_dir = "/var/mobile/Containers/Data/dawn-eats"
//! ```
//!
//! Every field has a default, so a missing file or an empty one is the
//! development configuration. `DAWN_API_URL`, when set and non-empty,
//! replaces `base_url`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::DEFAULT_BASE_URL;
use crate::session::{Session, TOKEN_KEY};
use crate::store::FileTokenStore;

/// Environment variable that overrides `base_url`.
pub const ENV_BASE_URL: &str = "DAWN_API_URL";

/// Directory name used under the platform data directory.
pub const APP_DIR: &str = "dawn-eats";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no platform data directory available; set data_dir")]
    NoDataDir,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, including the version prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Storage key for the session token.
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Where the token file lives. `None` means the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_token_key() -> String {
    TOKEN_KEY.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_key: default_token_key(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read `path`; a file that does not exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply `DAWN_API_URL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(ENV_BASE_URL).ok())
    }

    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    pub fn token_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    /// A session persisted under `token_dir()`.
    pub fn file_session(&self) -> Result<Session, ConfigError> {
        let store = FileTokenStore::new(self.token_dir()?);
        Ok(Session::with_key(store, &self.token_key))
    }
}
