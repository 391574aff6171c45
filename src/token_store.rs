//! Durable slot for the refresh token.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use directories::ProjectDirs;

/// File name of the refresh-token slot inside the data directory.
const REFRESH_TOKEN_FILE: &str = "cv_optimizer_refresh_token";

/// Where the refresh token survives between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// A file under the platform data directory; survives restarts.
    #[default]
    Durable,
    /// Process memory only; lost on exit.
    ProcessLocal,
}

/// Single-value store for the refresh token.
///
/// Every mutation is a whole-value replace or clear. When the durable medium
/// is unavailable the store silently degrades to the in-process holder,
/// which does not survive a restart.
pub(crate) struct TokenStore {
    slot_path: Option<PathBuf>,
    in_memory: RwLock<String>,
}

impl TokenStore {
    pub fn new(mode: StorageMode) -> Self {
        let slot_path = match mode {
            StorageMode::Durable => default_slot_path(),
            StorageMode::ProcessLocal => None,
        };
        Self::from_slot(slot_path)
    }

    /// Store backed by an explicit file, regardless of the configured mode.
    pub fn at_path(path: PathBuf) -> Self {
        Self::from_slot(prepare_slot(path))
    }

    fn from_slot(slot_path: Option<PathBuf>) -> Self {
        Self {
            slot_path,
            in_memory: RwLock::new(String::new()),
        }
    }

    /// Current token, empty if absent. A readable durable slot refreshes the
    /// in-process copy; an unreadable one falls back to it.
    pub fn read(&self) -> String {
        let Some(path) = &self.slot_path else {
            return self.in_memory.read().expect("token slot lock").clone();
        };
        match fs::read_to_string(path) {
            Ok(token) => {
                *self.in_memory.write().expect("token slot lock") = token.clone();
                token
            }
            Err(_) => self.in_memory.read().expect("token slot lock").clone(),
        }
    }

    pub fn write(&self, token: &str) {
        *self.in_memory.write().expect("token slot lock") = token.to_string();
        if let Some(path) = &self.slot_path {
            if let Err(err) = fs::write(path, token) {
                tracing::debug!(error = %err, "refresh token not persisted; in-process copy only");
            }
        }
    }

    pub fn clear(&self) {
        self.in_memory.write().expect("token slot lock").clear();
        if let Some(path) = &self.slot_path {
            let _ = fs::remove_file(path);
        }
    }
}

fn default_slot_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "cv-optimizer")?;
    prepare_slot(dirs.data_dir().join(REFRESH_TOKEN_FILE))
}

/// Ensures the parent directory exists; `None` means the medium is
/// unavailable and the store stays in-process.
fn prepare_slot(path: PathBuf) -> Option<PathBuf> {
    let parent = path.parent()?;
    if fs::create_dir_all(parent).is_err() {
        tracing::debug!(path = %path.display(), "token storage unavailable; using in-process slot");
        return None;
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durable_slot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at_path(dir.path().join("slot"));

        assert_eq!(store.read(), "");
        store.write("refresh-1");
        assert_eq!(store.read(), "refresh-1");

        // A second store over the same path sees the persisted value.
        let reopened = TokenStore::at_path(dir.path().join("slot"));
        assert_eq!(reopened.read(), "refresh-1");

        store.clear();
        assert_eq!(store.read(), "");
        let after_clear = TokenStore::at_path(dir.path().join("slot"));
        assert_eq!(after_clear.read(), "");
    }

    #[test]
    fn process_local_slot_does_not_touch_disk() {
        let store = TokenStore::new(StorageMode::ProcessLocal);
        store.write("ephemeral");
        assert_eq!(store.read(), "ephemeral");
        store.clear();
        assert_eq!(store.read(), "");
    }

    #[test]
    fn unavailable_medium_falls_back_to_in_process_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot");
        let store = TokenStore::at_path(path.clone());
        store.write("kept");

        // Make the durable slot unreadable by replacing it with a directory.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        assert_eq!(store.read(), "kept");
    }
}
