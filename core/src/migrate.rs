// coursecart/src/migrate.rs

//! The legacy-source migrator.
//!
//! Drains the deprecated storage locations into the canonical collection once
//! per session. Each location is deleted as soon as it has been absorbed, so a
//! second run finds nothing. `bookCart` is not a source.

use crate::core::line_item::LineItem;
use crate::core::raw_item::RawItem;
use crate::error::StorageError;
use crate::normalize::Normalizer;
use crate::storage::adapter::CartStorage;
use tracing::{event, instrument, Level};

/// What a migration run did.
#[derive(Debug, Default)]
pub struct Migration {
  /// Normalized items appended to the canonical collection, in source order.
  pub absorbed: Vec<LineItem>,
  /// Legacy records skipped because their id was already in the cart.
  pub duplicates: usize,
  /// Set when writing the merged collection back failed.
  pub persist_error: Option<StorageError>,
}

impl Migration {
  pub fn absorbed_count(&self) -> usize {
    self.absorbed.len()
  }
}

/// Runs one migration pass against `storage`.
///
/// The canonical key's existing records are kept as they are, absorbed items
/// are appended after them, and the result is written back if anything was
/// absorbed. Records whose id loosely matches an existing or already absorbed
/// item are skipped.
#[instrument(name = "migrate_legacy", skip_all)]
pub async fn migrate(storage: &CartStorage, normalizer: &Normalizer) -> Migration {
  event!(Level::DEBUG, "Checking for legacy cart data.");
  let mut existing: Vec<RawItem> = storage.load().await.unwrap_or_default();
  let mut migration = Migration::default();

  for source in storage.keys().migration_sources() {
    let Some(records) = storage.read_records(&source.key, source.shape).await else {
      continue;
    };
    event!(Level::INFO, key = %source.key, records = records.len(), "Found legacy cart data.");

    for record in &records {
      let item = normalizer.normalize(record);
      let already_present = existing
        .iter()
        .filter_map(|r| r.id.as_ref())
        .chain(migration.absorbed.iter().map(|i| &i.id))
        .any(|id| id.loosely_eq(&item.id));
      if already_present {
        event!(Level::DEBUG, item_id = %item.id, key = %source.key, "Legacy item already in cart; skipping.");
        migration.duplicates += 1;
        continue;
      }
      migration.absorbed.push(item);
    }

    if let Err(err) = storage.remove(&source.key).await {
      event!(Level::WARN, key = %source.key, error = %err, "Failed to delete migrated legacy key.");
    }
  }

  if migration.absorbed.is_empty() {
    return migration;
  }

  existing.extend(migration.absorbed.iter().cloned().map(RawItem::from));
  if let Err(err) = storage.save_records(&existing).await {
    migration.persist_error = Some(err);
  }
  event!(
    Level::INFO,
    migrated = migration.absorbed.len(),
    duplicates = migration.duplicates,
    "Migrated items from legacy storage."
  );
  migration
}
