// coursecart/src/storage/memory.rs

//! An in-process `KeyValueStore`. Used by tests, by hosts without a durable
//! backend, and for fault injection.

use crate::error::StorageError;
use crate::storage::store::{KeyValueStore, StorageArea, StorageKey};
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{event, Level};

/// How injected write failures present themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
  QuotaExceeded,
  AccessDenied,
  Unavailable,
}

impl FailureMode {
  fn to_error(self, key: &StorageKey) -> StorageError {
    let key = key.to_string();
    match self {
      FailureMode::QuotaExceeded => StorageError::QuotaExceeded { key },
      FailureMode::AccessDenied => StorageError::AccessDenied { key },
      FailureMode::Unavailable => StorageError::Unavailable {
        key,
        source: anyhow!("injected storage failure"),
      },
    }
  }
}

#[derive(Debug, Default)]
struct MemoryInner {
  durable: HashMap<String, String>,
  session: HashMap<String, String>,
  write_failure: Option<FailureMode>,
  read_failure: Option<FailureMode>,
  /// Upper bound on the summed byte length of durable values.
  quota_bytes: Option<usize>,
  set_calls: usize,
}

impl MemoryInner {
  fn area(&self, area: StorageArea) -> &HashMap<String, String> {
    match area {
      StorageArea::Durable => &self.durable,
      StorageArea::Session => &self.session,
    }
  }

  fn area_mut(&mut self, area: StorageArea) -> &mut HashMap<String, String> {
    match area {
      StorageArea::Durable => &mut self.durable,
      StorageArea::Session => &mut self.session,
    }
  }

  fn durable_bytes_with(&self, key: &str, value_len: usize) -> usize {
    self
      .durable
      .iter()
      .filter(|(k, _)| k.as_str() != key)
      .map(|(k, v)| k.len() + v.len())
      .sum::<usize>()
      + key.len()
      + value_len
  }
}

/// `KeyValueStore` over two hash maps behind a `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: RwLock<MemoryInner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// A store whose durable area holds at most `bytes` bytes of keys plus values.
  pub fn with_quota(bytes: usize) -> Self {
    let store = Self::default();
    store.inner.write().quota_bytes = Some(bytes);
    store
  }

  /// Every subsequent `set` fails with `mode` until `heal` is called.
  pub fn fail_writes(&self, mode: FailureMode) {
    self.inner.write().write_failure = Some(mode);
  }

  /// Every subsequent `get` and `keys` fails with `mode` until `heal` is called.
  pub fn fail_reads(&self, mode: FailureMode) {
    self.inner.write().read_failure = Some(mode);
  }

  pub fn heal(&self) {
    let mut inner = self.inner.write();
    inner.write_failure = None;
    inner.read_failure = None;
  }

  /// Number of `set` calls made so far, failed ones included.
  pub fn set_calls(&self) -> usize {
    self.inner.read().set_calls
  }

  /// Writes directly, bypassing failure injection and the call counter.
  pub fn seed(&self, key: &StorageKey, value: impl Into<String>) {
    self.inner.write().area_mut(key.area).insert(key.name.clone(), value.into());
  }

  /// Reads directly, bypassing failure injection.
  pub fn peek(&self, key: &StorageKey) -> Option<String> {
    self.inner.read().area(key.area).get(&key.name).cloned()
  }

  pub fn contains(&self, key: &StorageKey) -> bool {
    self.inner.read().area(key.area).contains_key(&key.name)
  }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
  async fn get(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
    let inner = self.inner.read();
    if let Some(mode) = inner.read_failure {
      return Err(mode.to_error(key));
    }
    Ok(inner.area(key.area).get(&key.name).cloned())
  }

  async fn set(&self, key: &StorageKey, value: String) -> Result<(), StorageError> {
    let mut inner = self.inner.write();
    inner.set_calls += 1;
    if let Some(mode) = inner.write_failure {
      event!(Level::DEBUG, %key, ?mode, "Injected write failure.");
      return Err(mode.to_error(key));
    }
    if key.area == StorageArea::Durable {
      if let Some(quota) = inner.quota_bytes {
        if inner.durable_bytes_with(&key.name, value.len()) > quota {
          return Err(StorageError::QuotaExceeded { key: key.to_string() });
        }
      }
    }
    inner.area_mut(key.area).insert(key.name.clone(), value);
    Ok(())
  }

  async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
    let mut inner = self.inner.write();
    if let Some(mode) = inner.write_failure {
      return Err(mode.to_error(key));
    }
    inner.area_mut(key.area).remove(&key.name);
    Ok(())
  }

  async fn keys(&self, area: StorageArea) -> Result<Vec<String>, StorageError> {
    let inner = self.inner.read();
    if let Some(mode) = inner.read_failure {
      return Err(mode.to_error(&StorageKey {
        area,
        name: "*".to_string(),
      }));
    }
    let mut names: Vec<String> = inner.area(area).keys().cloned().collect();
    names.sort();
    Ok(names)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn areas_are_independent() {
    let store = MemoryStore::new();
    store.set(&StorageKey::durable("cart"), "[1]".into()).await.unwrap();
    store.set(&StorageKey::session("cart"), "[2]".into()).await.unwrap();
    assert_eq!(store.get(&StorageKey::durable("cart")).await.unwrap().as_deref(), Some("[1]"));
    assert_eq!(store.get(&StorageKey::session("cart")).await.unwrap().as_deref(), Some("[2]"));
    store.remove(&StorageKey::session("cart")).await.unwrap();
    assert_eq!(store.get(&StorageKey::session("cart")).await.unwrap(), None);
    assert_eq!(store.keys(StorageArea::Durable).await.unwrap(), vec!["cart".to_string()]);
  }

  #[tokio::test]
  async fn quota_is_enforced_on_durable_area() {
    let store = MemoryStore::with_quota(10);
    let key = StorageKey::durable("cart");
    store.set(&key, "[]".into()).await.unwrap();
    let err = store.set(&key, "x".repeat(20)).await.unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    assert_eq!(store.peek(&key).as_deref(), Some("[]"));
    store.set(&StorageKey::session("big"), "x".repeat(20)).await.unwrap();
  }

  #[tokio::test]
  async fn injected_failures_count_and_heal() {
    let store = MemoryStore::new();
    store.fail_writes(FailureMode::AccessDenied);
    let err = store.set(&StorageKey::durable("cart"), "[]".into()).await.unwrap_err();
    assert!(matches!(err, StorageError::AccessDenied { .. }));
    assert_eq!(store.set_calls(), 1);
    store.heal();
    store.set(&StorageKey::durable("cart"), "[]".into()).await.unwrap();
    assert_eq!(store.set_calls(), 2);
  }
}
