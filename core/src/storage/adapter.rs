// coursecart/src/storage/adapter.rs

//! The persistence adapter between the cart engine and a `KeyValueStore`.
//!
//! Reads never fail: a missing, unreadable or malformed value reads as "no
//! data". The first failed write switches the adapter into memory-only mode
//! for the rest of its life; from then on saves are skipped without touching
//! the store.

use crate::core::line_item::LineItem;
use crate::core::raw_item::RawItem;
use crate::error::StorageError;
use crate::storage::keys::{KeyCatalogue, RecordShape};
use crate::storage::store::{KeyValueStore, StorageArea, StorageKey};
use anyhow::anyhow;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Cheap to clone; clones share the store and the memory-only flag.
#[derive(Clone)]
pub struct CartStorage {
  store: Arc<dyn KeyValueStore>,
  keys: Arc<KeyCatalogue>,
  memory_only: Arc<AtomicBool>,
}

impl std::fmt::Debug for CartStorage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartStorage")
      .field("primary", self.keys.primary())
      .field("memory_only", &self.is_memory_only())
      .finish()
  }
}

impl CartStorage {
  pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyCatalogue) -> Self {
    Self {
      store,
      keys: Arc::new(keys),
      memory_only: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn keys(&self) -> &KeyCatalogue {
    &self.keys
  }

  pub fn is_memory_only(&self) -> bool {
    self.memory_only.load(Ordering::SeqCst)
  }

  /// Switches to memory-only mode. Returns `true` only for the call that
  /// actually made the switch.
  pub fn enter_memory_only(&self) -> bool {
    let switched = !self.memory_only.swap(true, Ordering::SeqCst);
    if switched {
      event!(Level::WARN, "Falling back to memory-only mode; cart changes will not persist.");
    }
    switched
  }

  /// Writes and deletes a throwaway durable key to check the store is usable.
  #[instrument(name = "CartStorage::probe", skip(self), err(Display))]
  pub async fn probe(&self) -> Result<(), StorageError> {
    let probe_key = self.keys.probe();
    self.store.set(&probe_key, "test".to_string()).await?;
    self.store.remove(&probe_key).await
  }

  /// Reads the canonical collection. `None` means nothing usable is stored.
  pub async fn load(&self) -> Option<Vec<RawItem>> {
    let primary = self.keys.primary().clone();
    self.read_records(&primary, RecordShape::List).await
  }

  /// Reads the records stored under `key`. A `List` location must hold an
  /// array; a `Single` location must hold one object, read as one record.
  /// Every failure, a wrong shape included, reads as `None`.
  pub async fn read_records(&self, key: &StorageKey, shape: RecordShape) -> Option<Vec<RawItem>> {
    let text = match self.store.get(key).await {
      Ok(Some(text)) if !text.is_empty() => text,
      Ok(_) => return None,
      Err(err) => {
        event!(Level::WARN, %key, error = %err, "Storage read failed; treating as no data.");
        return None;
      }
    };
    let value: Value = match serde_json::from_str(&text) {
      Ok(value) => value,
      Err(err) => {
        event!(Level::WARN, %key, error = %err, "Stored value is not valid JSON; treating as no data.");
        return None;
      }
    };
    let records = match shape {
      RecordShape::List => RawItem::records_from_array(value),
      RecordShape::Single => RawItem::record_from_object(value).map(|record| vec![record]),
    };
    if records.is_none() {
      event!(Level::WARN, %key, ?shape, "Stored value has the wrong shape; treating as no data.");
    }
    records
  }

  /// Persists the canonical collection. A no-op in memory-only mode.
  pub async fn save(&self, items: &[LineItem]) -> Result<(), StorageError> {
    self.write_primary(items).await
  }

  /// Persists raw records under the canonical key (used when merging legacy
  /// data in, so records that are not yet validated survive untouched).
  pub async fn save_records(&self, records: &[RawItem]) -> Result<(), StorageError> {
    self.write_primary(records).await
  }

  #[instrument(name = "CartStorage::write_primary", skip_all, fields(key = %self.keys.primary()))]
  async fn write_primary<T: Serialize + Sync>(&self, payload: &[T]) -> Result<(), StorageError> {
    if self.is_memory_only() {
      event!(Level::DEBUG, "Save skipped (memory-only mode).");
      return Ok(());
    }
    let primary = self.keys.primary();
    let text = serde_json::to_string(payload).map_err(|err| StorageError::Unavailable {
      key: primary.to_string(),
      source: anyhow!(err),
    })?;
    match self.store.set(primary, text).await {
      Ok(()) => {
        event!(Level::DEBUG, count = payload.len(), "Cart saved to storage.");
        Ok(())
      }
      Err(err) => {
        event!(Level::ERROR, error = %err, "Storage error during save.");
        self.enter_memory_only();
        Err(err)
      }
    }
  }

  pub async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
    self.store.remove(key).await
  }

  /// Names of the durable keys present, for diagnostics.
  pub async fn durable_keys(&self) -> Result<Vec<String>, StorageError> {
    self.store.keys(StorageArea::Durable).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalize::normalize;
  use crate::storage::memory::{FailureMode, MemoryStore};

  fn storage_over(store: &Arc<MemoryStore>) -> CartStorage {
    CartStorage::new(store.clone(), KeyCatalogue::default())
  }

  #[tokio::test]
  async fn malformed_json_reads_as_no_data() {
    let store = Arc::new(MemoryStore::new());
    store.seed(&StorageKey::durable("cart"), "{not json");
    assert!(storage_over(&store).load().await.is_none());
  }

  #[tokio::test]
  async fn read_failure_reads_as_no_data() {
    let store = Arc::new(MemoryStore::new());
    store.seed(&StorageKey::durable("cart"), "[]");
    store.fail_reads(FailureMode::AccessDenied);
    assert!(storage_over(&store).load().await.is_none());
  }

  #[tokio::test]
  async fn failed_save_switches_to_memory_only() {
    let store = Arc::new(MemoryStore::new());
    let storage = storage_over(&store);
    let items = vec![normalize(&RawItem::new().with_id("a").with_title("A").with_price(5.0))];

    storage.save(&items).await.unwrap();
    assert_eq!(store.set_calls(), 1);

    store.fail_writes(FailureMode::QuotaExceeded);
    let err = storage.save(&items).await.unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    assert!(storage.is_memory_only());

    store.heal();
    storage.save(&items).await.unwrap();
    assert_eq!(store.set_calls(), 2);
  }

  #[tokio::test]
  async fn saved_items_load_back() {
    let store = Arc::new(MemoryStore::new());
    let storage = storage_over(&store);
    let items = vec![normalize(&RawItem::new().with_id(7_i64).with_title("Seven").with_price("£7"))];
    storage.save(&items).await.unwrap();
    let records = storage.load().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, Some(crate::core::item_id::ItemId::Number(7)));
  }
}
