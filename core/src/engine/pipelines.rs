// coursecart/src/engine/pipelines.rs

//! The engine's two multi-step sequences, each a `Pipeline` over its own
//! scratch data: startup (probe, migrate, load, validate) and recovery.
//!
//! Handlers never fail on storage problems. They record the failure in the
//! scratch data and let the engine decide what the user sees.

use crate::classify::Operation;
use crate::core::control::StepControl;
use crate::core::line_item::LineItem;
use crate::core::raw_item::RawItem;
use crate::core::shared_state::SharedState;
use crate::engine::events::CartPhase;
use crate::engine::state::CartState;
use crate::error::{CartError, StorageError};
use crate::migrate::migrate;
use crate::normalize::Normalizer;
use crate::pipeline::Pipeline;
use crate::recovery::attempt_recovery;
use crate::storage::adapter::CartStorage;
use crate::storage::store::StorageKey;
use crate::validate::{admit, validate};
use std::mem;
use tracing::{event, Level};

pub(crate) const STARTUP_STEPS: &[(&str, bool)] = &[
  ("probe_storage", true),
  ("migrate_legacy", false),
  ("load_primary", false),
  ("validate", false),
  ("ready", false),
];

pub(crate) const RECOVERY_STEPS: &[(&str, bool)] = &[("scan", false), ("admit", false), ("replace", false)];

/// Scratch data for one startup run.
pub(crate) struct StartupData {
  pub storage: CartStorage,
  pub normalizer: Normalizer,
  pub cart: SharedState<CartState>,
  pub probe_error: Option<StorageError>,
  pub migrated: Vec<LineItem>,
  pub loaded: Vec<RawItem>,
  pub items: Vec<LineItem>,
  /// First persistence failure hit during startup, with where it happened.
  pub storage_failure: Option<(Operation, StorageError)>,
}

impl StartupData {
  pub fn new(storage: CartStorage, normalizer: Normalizer, cart: SharedState<CartState>) -> Self {
    Self {
      storage,
      normalizer,
      cart,
      probe_error: None,
      migrated: Vec::new(),
      loaded: Vec::new(),
      items: Vec::new(),
      storage_failure: None,
    }
  }

  /// Keeps only the first failure.
  fn record_failure(&mut self, operation: Operation, err: StorageError) {
    if self.storage_failure.is_none() {
      self.storage_failure = Some((operation, err));
    }
  }
}

pub(crate) fn startup_pipeline(probe_storage: bool) -> Pipeline<StartupData> {
  let mut p = Pipeline::new("cart_startup", STARTUP_STEPS);

  if probe_storage {
    p.on_step("probe_storage", |ctx: SharedState<StartupData>| async move {
      let storage = ctx.read().storage.clone();
      if let Err(err) = storage.probe().await {
        event!(Level::WARN, error = %err, "Storage probe failed; starting in memory-only mode.");
        storage.enter_memory_only();
        ctx.write().probe_error = Some(err);
      }
      Ok::<_, CartError>(StepControl::Continue)
    });
  }

  p.on_step("migrate_legacy", |ctx: SharedState<StartupData>| async move {
    let (storage, normalizer, cart) = {
      let data = ctx.read();
      (data.storage.clone(), data.normalizer.clone(), data.cart.clone())
    };
    cart.write().phase = CartPhase::Migrating;

    let migration = migrate(&storage, &normalizer).await;
    let mut data = ctx.write();
    if let Some(err) = migration.persist_error {
      data.record_failure(Operation::Migrate, err);
    }
    data.migrated = migration.absorbed;
    Ok::<_, CartError>(StepControl::Continue)
  });

  p.on_step("load_primary", |ctx: SharedState<StartupData>| async move {
    let storage = ctx.read().storage.clone();
    let loaded = storage.load().await.unwrap_or_default();
    event!(Level::DEBUG, records = loaded.len(), "Loaded stored cart records.");

    let mut data = ctx.write();
    data.loaded = loaded;
    data.cart.write().phase = CartPhase::Loaded;
    Ok::<_, CartError>(StepControl::Continue)
  });

  p.on_step("validate", |ctx: SharedState<StartupData>| async move {
    let (storage, items, needs_save) = {
      let mut data = ctx.write();
      let admitted = admit(mem::take(&mut data.loaded));
      let mut items = admitted.items;

      // Migrated items are normally in the stored collection by now. They are
      // not when the write-back failed or was skipped.
      let unsaved: Vec<LineItem> = mem::take(&mut data.migrated)
        .into_iter()
        .filter(|m| !items.iter().any(|i| i.id.loosely_eq(&m.id)))
        .collect();
      let unsaved = validate(unsaved);
      let appended = unsaved.items.len();
      items.extend(unsaved.items);
      if appended > 0 {
        event!(Level::DEBUG, appended, "Kept unsaved migrated items in memory.");
      }

      (data.storage.clone(), items, admitted.dropped > 0 || appended > 0)
    };

    if needs_save {
      if let Err(err) = storage.save(&items).await {
        ctx.write().record_failure(Operation::Save, err);
      }
    }
    ctx.write().items = items;
    Ok::<_, CartError>(StepControl::Continue)
  });

  p.on_step("ready", |ctx: SharedState<StartupData>| async move {
    let mut data = ctx.write();
    let items = mem::take(&mut data.items);
    let mut cart = data.cart.write();
    event!(Level::INFO, items = items.len(), "Cart ready.");
    cart.items = items;
    cart.phase = CartPhase::Ready;
    Ok::<_, CartError>(StepControl::Continue)
  });

  p
}

/// Scratch data for one recovery run.
pub(crate) struct RecoveryData {
  pub storage: CartStorage,
  pub normalizer: Normalizer,
  pub cart: SharedState<CartState>,
  pub source: Option<StorageKey>,
  pub records: Vec<RawItem>,
  pub items: Vec<LineItem>,
  pub storage_failure: Option<StorageError>,
}

impl RecoveryData {
  pub fn new(storage: CartStorage, normalizer: Normalizer, cart: SharedState<CartState>) -> Self {
    Self {
      storage,
      normalizer,
      cart,
      source: None,
      records: Vec::new(),
      items: Vec::new(),
      storage_failure: None,
    }
  }
}

/// Stops early, leaving the cart untouched, when nothing usable is found.
pub(crate) fn recovery_pipeline() -> Pipeline<RecoveryData> {
  let mut p = Pipeline::new("cart_recovery", RECOVERY_STEPS);

  p.on_step("scan", |ctx: SharedState<RecoveryData>| async move {
    let storage = ctx.read().storage.clone();
    match attempt_recovery(&storage).await {
      Some(found) => {
        let mut data = ctx.write();
        data.source = Some(found.source);
        data.records = found.records;
        Ok::<_, CartError>(StepControl::Continue)
      }
      None => Ok(StepControl::Stop),
    }
  });

  p.on_step("admit", |ctx: SharedState<RecoveryData>| async move {
    let mut data = ctx.write();
    let records = mem::take(&mut data.records);
    let mut unique: Vec<LineItem> = Vec::with_capacity(records.len());
    for record in &records {
      let item = data.normalizer.normalize(record);
      if unique.iter().any(|kept| kept.id.loosely_eq(&item.id)) {
        event!(Level::DEBUG, item_id = %item.id, "Skipping repeated id in recovered data.");
        continue;
      }
      unique.push(item);
    }
    let validated = validate(unique);
    if validated.items.is_empty() {
      event!(Level::WARN, source = ?data.source, "Recovered data held no valid items.");
      return Ok::<_, CartError>(StepControl::Stop);
    }
    data.items = validated.items;
    Ok(StepControl::Continue)
  });

  p.on_step("replace", |ctx: SharedState<RecoveryData>| async move {
    let (storage, items) = {
      let data = ctx.read();
      data.cart.write().items = data.items.clone();
      (data.storage.clone(), data.items.clone())
    };
    if let Err(err) = storage.save(&items).await {
      ctx.write().storage_failure = Some(err);
    }
    Ok::<_, CartError>(StepControl::Continue)
  });

  p
}
