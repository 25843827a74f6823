//! File-backed storage provider.
//!
//! Key-value pairs live in one JSON file at:
//! - Linux: ~/.local/share/geoquest/state.json
//! - macOS: ~/Library/Application Support/io.geoquest.player/state.json
//! - Windows: C:\Users\<User>\AppData\Roaming\geoquest\player\data\state.json
//!
//! Reads are served from an in-memory cache. Every write replaces the file
//! through a temp file in the same directory, so a reader of the file sees
//! either the previous or the new contents.

use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tempfile::NamedTempFile;

use crate::ports::outbound::StorageProvider;

/// Platform data directory location of the state file.
pub fn default_storage_path() -> PathBuf {
    match ProjectDirs::from("io", "geoquest", "player") {
        Some(dirs) => dirs.data_dir().join("state.json"),
        None => PathBuf::from("geoquest_state.json"),
    }
}

#[derive(Clone)]
pub struct FileStorageProvider {
    storage_path: PathBuf,
    cache: Arc<RwLock<HashMap<String, String>>>,
    /// Serializes snapshot + replace so an older snapshot never lands last.
    io: Arc<Mutex<()>>,
}

impl FileStorageProvider {
    /// Open the store at `storage_path`, loading whatever it already holds.
    /// An unreadable or corrupt file starts the store empty.
    pub fn open(storage_path: impl Into<PathBuf>) -> Self {
        let storage_path = storage_path.into();
        let cache = Self::load_file(&storage_path);

        tracing::debug!(path = ?storage_path, entries = cache.len(), "File storage initialized");

        Self {
            storage_path,
            cache: Arc::new(RwLock::new(cache)),
            io: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    fn load_file(path: &Path) -> HashMap<String, String> {
        if !path.exists() {
            return HashMap::new();
        }
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<HashMap<String, String>>(&data) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Failed to parse storage file: {}", e);
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read storage file: {}", e);
                HashMap::new()
            }
        }
    }

    fn persist(&self) {
        let _io = self.io.lock().unwrap_or_else(PoisonError::into_inner);

        let data = match self.cache.read() {
            Ok(guard) => match serde_json::to_string_pretty(&*guard) {
                Ok(data) => data,
                Err(e) => {
                    tracing::error!("Failed to serialize storage data: {}", e);
                    return;
                }
            },
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                return;
            }
        };

        let dir = match self.storage_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::error!("Failed to create storage directory: {}", e);
            return;
        }

        let result = NamedTempFile::new_in(&dir).and_then(|mut file| {
            file.write_all(data.as_bytes())?;
            file.as_file().sync_all()?;
            file.persist(&self.storage_path).map_err(|e| e.error)?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!("Failed to write storage file: {}", e);
        }
    }
}

impl StorageProvider for FileStorageProvider {
    fn save(&self, key: &str, value: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                guard.insert(key.to_string(), value.to_string());
                drop(guard); // Release lock before I/O
                self.persist();
            }
            Err(e) => {
                tracing::error!("Failed to acquire write lock for storage: {}", e);
            }
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.cache.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                if guard.remove(key).is_none() {
                    return;
                }
                drop(guard);
                self.persist();
            }
            Err(e) => {
                tracing::error!("Failed to acquire write lock for storage: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let storage = FileStorageProvider::open(&path);
        storage.save("geoquest_resume_pointer", r#"{"a":1}"#);
        storage.save("other", "x");
        storage.remove("other");

        let reopened = FileStorageProvider::open(&path);
        assert_eq!(reopened.load("geoquest_resume_pointer").as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(reopened.load("other"), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ truncated").unwrap();

        let storage = FileStorageProvider::open(&path);
        assert_eq!(storage.load("anything"), None);

        storage.save("k", "v");
        assert_eq!(FileStorageProvider::open(&path).load("k").as_deref(), Some("v"));
    }
}
