use std::path::PathBuf;

use url::Url;

use crate::error::Error;
use crate::token_store::StorageMode;

/// Client configuration.
///
/// The required field (`base_url`) is a constructor parameter — no runtime
/// "missing field" errors. Use [`from_env()`](ClientConfig::from_env) for
/// convention-based setup, or [`new()`](ClientConfig::new) with `with_*`
/// methods for full control.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) storage_mode: StorageMode,
    pub(crate) token_slot: Option<PathBuf>,
    pub(crate) http: reqwest::Client,
}

impl ClientConfig {
    /// Create a configuration for the given API base address (origin plus
    /// prefix, e.g. `http://localhost:8000/api`).
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            storage_mode: StorageMode::default(),
            token_slot: None,
            http: reqwest::Client::new(),
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Optional env vars
    /// - `CV_API_BASE_URL`: API base address (default
    ///   `http://localhost:8000/api`)
    /// - `CV_REFRESH_TOKEN_STORAGE`: `"session"` keeps the refresh token in
    ///   process memory; any other value persists it durably
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `CV_API_BASE_URL` is set but not a valid
    /// URL.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = match std::env::var("CV_API_BASE_URL") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("CV_API_BASE_URL: {e}")))?,
            Err(_) => default_base_url(),
        };

        let storage_mode = match std::env::var("CV_REFRESH_TOKEN_STORAGE").as_deref() {
            Ok("session") => StorageMode::ProcessLocal,
            _ => StorageMode::Durable,
        };

        Ok(Self::new(base_url).with_storage_mode(storage_mode))
    }

    /// Override where the refresh token survives between calls.
    #[must_use]
    pub fn with_storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage_mode = mode;
        self
    }

    /// Persist the refresh token at an explicit file path instead of the
    /// platform data directory. Implies durable storage.
    #[must_use]
    pub fn with_refresh_token_path(mut self, path: PathBuf) -> Self {
        self.token_slot = Some(path);
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Configured API base address.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn default_base_url() -> Url {
    "http://localhost:8000/api".parse().expect("valid default URL")
}
