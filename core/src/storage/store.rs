// coursecart/src/storage/store.rs

//! Defines the `KeyValueStore` trait every cart backend implements.

use crate::error::StorageError;
use async_trait::async_trait;
use std::fmt;

/// Which store a key lives in. `Durable` outlives the process; `Session` is
/// scoped to one session and holds the short-lived legacy keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
  Durable,
  Session,
}

impl fmt::Display for StorageArea {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      StorageArea::Durable => "durable",
      StorageArea::Session => "session",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
  pub area: StorageArea,
  pub name: String,
}

impl StorageKey {
  pub fn durable(name: impl Into<String>) -> Self {
    Self {
      area: StorageArea::Durable,
      name: name.into(),
    }
  }

  pub fn session(name: impl Into<String>) -> Self {
    Self {
      area: StorageArea::Session,
      name: name.into(),
    }
  }
}

impl fmt::Display for StorageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.area, self.name)
  }
}

/// String-valued key/value storage with a durable and a session area.
///
/// Implementations report failures as `StorageError`; callers decide how to
/// degrade. `get` of a missing key is `Ok(None)`, and `remove` of a missing
/// key succeeds.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  async fn get(&self, key: &StorageKey) -> Result<Option<String>, StorageError>;

  async fn set(&self, key: &StorageKey, value: String) -> Result<(), StorageError>;

  async fn remove(&self, key: &StorageKey) -> Result<(), StorageError>;

  /// Names of the keys currently present in `area`, sorted.
  async fn keys(&self, area: StorageArea) -> Result<Vec<String>, StorageError>;
}
