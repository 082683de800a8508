// coursecart/src/storage/file.rs

//! A `KeyValueStore` whose durable area is a directory of files.
//!
//! Each durable key is stored as `<data_dir>/<key>.json`, written through a
//! temporary file and a rename. Durable key names are limited to ASCII letters,
//! digits, `-`, `_` and `.` so that every name maps to its own file; other names
//! are refused rather than rewritten. The session area lives in process memory and
//! disappears with the process.

use crate::error::StorageError;
use crate::storage::store::{KeyValueStore, StorageArea, StorageKey};
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{event, Level};

const FILE_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileStore {
  root: PathBuf,
  session: RwLock<HashMap<String, String>>,
}

impl FileStore {
  /// Opens (creating if needed) a store rooted at `root`.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
    let root = root.into();
    tokio::fs::create_dir_all(&root)
      .await
      .map_err(|err| map_io_error(&root.display().to_string(), err))?;
    event!(Level::DEBUG, root = %root.display(), "File store opened.");
    Ok(Self {
      root,
      session: RwLock::new(HashMap::new()),
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &StorageKey) -> Result<PathBuf, StorageError> {
    if !is_file_safe(&key.name) {
      return Err(StorageError::Unavailable {
        key: key.to_string(),
        source: anyhow!("key name cannot be stored as a file name"),
      });
    }
    Ok(self.root.join(format!("{}.{}", key.name, FILE_EXTENSION)))
  }
}

fn is_file_safe(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with('.')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn map_io_error(key: &str, err: std::io::Error) -> StorageError {
  match err.kind() {
    ErrorKind::PermissionDenied => StorageError::AccessDenied { key: key.to_string() },
    _ => StorageError::Io(err),
  }
}

#[async_trait]
impl KeyValueStore for FileStore {
  async fn get(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
    match key.area {
      StorageArea::Session => Ok(self.session.read().get(&key.name).cloned()),
      StorageArea::Durable => match tokio::fs::read_to_string(self.path_for(key)?).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(map_io_error(&key.to_string(), err)),
      },
    }
  }

  async fn set(&self, key: &StorageKey, value: String) -> Result<(), StorageError> {
    match key.area {
      StorageArea::Session => {
        self.session.write().insert(key.name.clone(), value);
        Ok(())
      }
      StorageArea::Durable => {
        let target = self.path_for(key)?;
        let staging = target.with_extension(format!("{}.tmp", FILE_EXTENSION));
        tokio::fs::write(&staging, value.as_bytes())
          .await
          .map_err(|err| map_io_error(&key.to_string(), err))?;
        tokio::fs::rename(&staging, &target)
          .await
          .map_err(|err| map_io_error(&key.to_string(), err))?;
        event!(Level::TRACE, %key, path = %target.display(), "Durable key written.");
        Ok(())
      }
    }
  }

  async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
    match key.area {
      StorageArea::Session => {
        self.session.write().remove(&key.name);
        Ok(())
      }
      StorageArea::Durable => match tokio::fs::remove_file(self.path_for(key)?).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(map_io_error(&key.to_string(), err)),
      },
    }
  }

  async fn keys(&self, area: StorageArea) -> Result<Vec<String>, StorageError> {
    let mut names = match area {
      StorageArea::Session => self.session.read().keys().cloned().collect::<Vec<_>>(),
      StorageArea::Durable => {
        let mut entries = tokio::fs::read_dir(&self.root)
          .await
          .map_err(|err| map_io_error(&self.root.display().to_string(), err))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
          let path = entry.path();
          if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
            continue;
          }
          if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
          }
        }
        names
      }
    };
    names.sort();
    Ok(names)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_plain_names_map_to_files() {
    assert!(is_file_safe("cart"));
    assert!(is_file_safe("cart_v2.backup"));
    assert!(is_file_safe("__storage_test__"));
    assert!(!is_file_safe(""));
    assert!(!is_file_safe("a/b"));
    assert!(!is_file_safe("../etc/passwd"));
    assert!(!is_file_safe(".hidden"));
    assert!(!is_file_safe("caf\u{e9}"));
  }
}
