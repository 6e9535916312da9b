//! Participant-local key/value storage (identity, cached profile, owned races).

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use dashmap::DashMap;
use thiserror::Error;

/// Convenient result alias returning [`LocalStoreError`] failures.
pub type LocalResult<T> = Result<T, LocalStoreError>;

/// Failures of a [`LocalStore`].
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// The state file exists but cannot be read.
    #[error("failed to read local state `{path}`")]
    Read {
        /// State file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The state file cannot be rewritten.
    #[error("failed to write local state `{path}`")]
    Write {
        /// State file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The state file holds something else than a flat JSON object.
    #[error("local state `{path}` is not a JSON object of strings")]
    Corrupt {
        /// State file.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A writer panicked while holding the entries.
    #[error("local state lock poisoned")]
    Poisoned,
}

/// String key/value storage surviving restarts of the participant's client.
pub trait LocalStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> LocalResult<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> LocalResult<()>;
}

/// Volatile store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: DashMap<String, String>,
}

impl MemoryLocalStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> LocalResult<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> LocalResult<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileLocalStore {
    /// Open the store at `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> LocalResult<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// File backing the store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> LocalResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| LocalStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> LocalResult<()> {
        let mut entries = self.entries.lock().map_err(|_| LocalStoreError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());

        let contents = serde_json::to_string_pretty(&*entries).map_err(|source| {
            LocalStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, contents).map_err(|source| LocalStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_entries(path: &Path) -> LocalResult<BTreeMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            serde_json::from_str(&contents).map_err(|source| LocalStoreError::Corrupt {
                path: path.to_owned(),
                source,
            })
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(source) => Err(LocalStoreError::Read {
            path: path.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("typerace-{name}-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn file_store_survives_reopening() {
        let path = scratch_path("reopen");
        {
            let store = FileLocalStore::open(&path).unwrap();
            assert_eq!(store.get("name").unwrap(), None);
            store.set("name", "Ada").unwrap();
        }

        let reopened = FileLocalStore::open(&path).unwrap();
        assert_eq!(reopened.get("name").unwrap().as_deref(), Some("Ada"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn file_store_rejects_non_object_files() {
        let path = scratch_path("corrupt");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            FileLocalStore::open(&path),
            Err(LocalStoreError::Corrupt { .. })
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryLocalStore::new();
        store.set("team", "Red").unwrap();
        store.set("team", "Blue").unwrap();
        assert_eq!(store.get("team").unwrap().as_deref(), Some("Blue"));
    }
}
