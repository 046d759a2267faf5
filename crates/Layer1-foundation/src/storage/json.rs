//! JSON file storage
//!
//! Thin load/save wrapper over a base directory. Every save rewrites the
//! whole document; there is no append log and no cross-process locking.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// JSON document store rooted at a directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir).map_err(|e| {
                Error::Persistence(format!(
                    "failed to create directory {}: {}",
                    self.base_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Load a document. A missing or fully empty file is `None`, the
    /// legitimate initial state; anything unparseable is a persistence error.
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if data.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| Error::Persistence(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Write a document, rewriting the file in full
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.file_path(filename);
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Persistence(format!("failed to serialize: {}", e)))?;
        std::fs::write(&path, content).map_err(|e| {
            Error::Persistence(format!("failed to write {}: {}", path.display(), e))
        })
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }

    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                Error::Persistence(format!("failed to remove {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}
