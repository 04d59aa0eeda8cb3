//! String key-value stores the client persists its collections in.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Storage key {0:?} is not allowed")]
    InvalidKey(String),
    #[error("I/O error on storage key {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

pub trait KeyValueStore: Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Removing a key that is not present is not an error.
    fn remove(&self, key: &str) -> Result<(), KvError>;
}

/// Keeps everything in memory; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary file that is renamed over the old value, so a
/// crash mid-write leaves either the old or the new value behind.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(KvError::InvalidKey(key.to_owned()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> KvError + '_ {
    move |source| KvError::Io {
        key: key.to_owned(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key)(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value).map_err(io_error(key))?;
        fs::rename(&tmp_path, &path).map_err(io_error(key))
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        match fs::remove_file(self.path(key)?) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(io_error(key)(err)),
            _ => Ok(()),
        }
    }
}
