//! File-backed [`LocalStore`]: one JSON file per key in a directory.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use siteframe::{LocalStore, LocalStoreError};

#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding `key`. Keys come from site ids in user input, so anything
    /// that could leave `dir` is rejected.
    fn path(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(LocalStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        match fs::read_to_string(self.path(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LocalStoreError::Io(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| LocalStoreError::Io(e.to_string()))?;
        fs::write(path, value).map_err(|e| LocalStoreError::Io(e.to_string()))
    }
}
