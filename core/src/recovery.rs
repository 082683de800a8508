// coursecart/src/recovery.rs

//! The recovery scanner: best-effort search for surviving cart data.
//!
//! Only runs on explicit request. It neither normalizes nor validates what it
//! finds; the engine does both before accepting the result.

use crate::core::raw_item::RawItem;
use crate::storage::adapter::CartStorage;
use crate::storage::keys::StoredLocation;
use crate::storage::store::StorageKey;
use tracing::{event, instrument, Level};

/// Records found by a recovery scan and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
  pub source: StorageKey,
  pub records: Vec<RawItem>,
}

/// Tries each location of the recovery order and returns the first non-empty,
/// parseable one of the expected shape. `None` when every location is empty, missing or unparseable.
#[instrument(name = "attempt_recovery", skip_all)]
pub async fn attempt_recovery(storage: &CartStorage) -> Option<Recovered> {
  event!(Level::INFO, "Attempting cart recovery.");
  for StoredLocation { key, shape } in storage.keys().recovery_order() {
    match storage.read_records(&key, shape).await {
      Some(records) if !records.is_empty() => {
        event!(Level::INFO, %key, records = records.len(), "Recovered cart data.");
        return Some(Recovered { source: key, records });
      }
      _ => event!(Level::TRACE, %key, "Nothing recoverable at location."),
    }
  }
  event!(Level::INFO, "No cart data found in any location.");
  None
}
