// coursecart/src/engine/mod.rs

//! The cart engine: sole owner of the canonical collection.
//!
//! Every mutating operation takes the engine's mutation gate for its whole
//! duration, so mutations never overlap. The first operation on a fresh
//! engine runs the startup sequence (probe, migrate, load, validate) if
//! `initialize` has not been called.
//!
//! Storage failures never surface as errors from the operations themselves.
//! The mutation is kept in memory, the engine degrades to memory-only mode for
//! the rest of its life, and the user is told once. Conflicts come back as
//! `CartError::Conflict` and are also announced as a toast.

pub mod events;
pub(crate) mod pipelines;
pub(crate) mod state;

pub use events::{CartEvent, CartPhase, CartSnapshot, DebugReport, Severity, Toast};

use crate::classify::{classify, ErrorCategory, Fallback, Operation};
use crate::config::CartConfig;
use crate::core::control::RunOutcome;
use crate::core::item_id::ItemId;
use crate::core::line_item::LineItem;
use crate::core::raw_item::RawItem;
use crate::core::shared_state::SharedState;
use crate::error::{CartError, CartResult, ConflictKind};
use crate::normalize::Normalizer;
use crate::storage::adapter::CartStorage;
use crate::storage::keys::KeyCatalogue;
use crate::storage::store::KeyValueStore;
use crate::validate::check;
use events::total_of;
use pipelines::{recovery_pipeline, startup_pipeline, RecoveryData, StartupData};
use state::CartState;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{event, instrument, Level};

pub const ADDED_MESSAGE: &str = "Item added to cart!";
pub const REMOVED_MESSAGE: &str = "Item removed from cart";
pub const CLEARED_MESSAGE: &str = "Cart cleared";
pub const NOTHING_TO_RECOVER_MESSAGE: &str = "No cart data found to recover";
pub const NOT_PERSISTING_MESSAGE: &str =
  "Cart storage is unavailable. Your cart will not be saved when you leave this page.";

pub struct CartEngine {
  config: CartConfig,
  storage: CartStorage,
  normalizer: Normalizer,
  state: SharedState<CartState>,
  gate: Mutex<()>,
  events: broadcast::Sender<CartEvent>,
  storage_failure_reported: AtomicBool,
}

impl std::fmt::Debug for CartEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartEngine")
      .field("storage", &self.storage)
      .field("phase", &self.phase())
      .field("items", &self.state.read().items.len())
      .finish()
  }
}

impl CartEngine {
  /// Creates an uninitialized engine over `store`. Nothing is read until
  /// `initialize` or the first operation.
  pub fn new(store: Arc<dyn KeyValueStore>, config: CartConfig) -> Self {
    let storage = CartStorage::new(store, KeyCatalogue::new(&config.storage_key));
    let normalizer = Normalizer::new(config.placeholder_title.clone());
    let (events, _) = broadcast::channel(config.event_capacity.max(1));
    Self {
      config,
      storage,
      normalizer,
      state: SharedState::default(),
      gate: Mutex::new(()),
      events,
      storage_failure_reported: AtomicBool::new(false),
    }
  }

  /// Creates an engine and runs the startup sequence.
  pub async fn start(store: Arc<dyn KeyValueStore>, config: CartConfig) -> CartResult<Self> {
    let engine = Self::new(store, config);
    engine.initialize().await?;
    Ok(engine)
  }

  pub fn config(&self) -> &CartConfig {
    &self.config
  }

  pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
    self.events.subscribe()
  }

  /// Runs the startup sequence once. Later calls are no-ops.
  pub async fn initialize(&self) -> CartResult<()> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await
  }

  // --- Read-only accessors ---

  pub fn phase(&self) -> CartPhase {
    self.state.read().phase
  }

  pub fn is_memory_only(&self) -> bool {
    self.storage.is_memory_only()
  }

  pub fn items(&self) -> Vec<LineItem> {
    self.state.read().items.clone()
  }

  /// Sum of quantities across all lines.
  pub fn count(&self) -> u64 {
    self.state.with(|s| s.items.iter().map(|i| u64::from(i.quantity)).sum())
  }

  pub fn total(&self) -> f64 {
    self.state.with(|s| total_of(&s.items))
  }

  pub fn snapshot(&self) -> CartSnapshot {
    CartSnapshot::new(self.items(), self.config.currency_label.clone())
  }

  pub async fn debug_report(&self) -> DebugReport {
    let durable_keys = match self.storage.durable_keys().await {
      Ok(keys) => Some(keys),
      Err(err) => {
        event!(Level::WARN, error = %err, "Could not list durable keys.");
        None
      }
    };
    DebugReport {
      phase: self.phase(),
      memory_only: self.is_memory_only(),
      storage_key: self.storage.keys().primary().name.clone(),
      snapshot: self.snapshot(),
      durable_keys,
    }
  }

  // --- Mutations ---

  /// Normalizes `raw` and appends it. Items that fail validation are refused
  /// without a toast; duplicates (by loose id equality) are a conflict.
  #[instrument(name = "CartEngine::add_item", skip_all, err(Display))]
  pub async fn add_item(&self, raw: RawItem) -> CartResult<LineItem> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;
    self.add_locked(raw, Operation::Add).await
  }

  #[instrument(name = "CartEngine::remove_item", skip(self, id), fields(item_id = %id), err(Display))]
  pub async fn remove_item(&self, id: &ItemId) -> CartResult<()> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;
    self.remove_locked(id, Operation::Remove).await
  }

  /// Sets an item's quantity. Zero removes the item; negative values and
  /// values that do not fit a quantity are refused.
  #[instrument(name = "CartEngine::update_quantity", skip(self, id), fields(item_id = %id), err(Display))]
  pub async fn update_quantity(&self, id: &ItemId, quantity: i64) -> CartResult<()> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;

    if quantity == 0 {
      return self.remove_locked(id, Operation::UpdateQuantity).await;
    }
    let quantity = match u32::try_from(quantity) {
      Ok(q) => q,
      Err(_) => {
        return Err(self.conflict(
          ConflictKind::InvalidQuantity,
          format!("invalid quantity: {}", quantity),
          Operation::UpdateQuantity,
        ))
      }
    };

    let updated = {
      let mut state = self.state.write();
      match state.items.iter_mut().find(|item| item.id.loosely_eq(id)) {
        Some(item) => {
          item.quantity = quantity;
          true
        }
        None => false,
      }
    };
    if !updated {
      return Err(self.conflict(
        ConflictKind::ItemNotFound,
        format!("item {} not found", id),
        Operation::UpdateQuantity,
      ));
    }

    event!(Level::INFO, quantity, "Quantity updated.");
    self.persist(Operation::UpdateQuantity).await;
    self.publish_state();
    Ok(())
  }

  /// Empties the cart and deletes every key a reset covers, legacy ones included.
  #[instrument(name = "CartEngine::clear", skip_all, err(Display))]
  pub async fn clear(&self) -> CartResult<()> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;
    self.clear_locked().await;
    Ok(())
  }

  /// Replaces the cart with `raw` alone and signals checkout navigation.
  ///
  /// Runs as one mutation: nothing else can interleave between the clear and
  /// the add. If the add is refused the cart stays empty.
  #[instrument(name = "CartEngine::enroll_now", skip_all, err(Display))]
  pub async fn enroll_now(&self, raw: RawItem) -> CartResult<LineItem> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;
    self.clear_locked().await;
    let item = self.add_locked(raw, Operation::EnrollNow).await?;
    self.emit(CartEvent::NavigateToCheckout);
    Ok(item)
  }

  /// Signals checkout navigation, unless the cart is empty.
  #[instrument(name = "CartEngine::begin_checkout", skip_all, err(Display))]
  pub async fn begin_checkout(&self) -> CartResult<()> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;
    if self.state.read().items.is_empty() {
      return Err(self.conflict(
        ConflictKind::EmptyCartCheckout,
        "checkout requested with an empty cart",
        Operation::Checkout,
      ));
    }
    self.emit(CartEvent::NavigateToCheckout);
    Ok(())
  }

  /// Replaces the cart with whatever the recovery scan finds first. Returns
  /// the number of items kept; zero means nothing usable was found and the
  /// cart was left alone.
  #[instrument(name = "CartEngine::recover", skip_all, err(Display))]
  pub async fn recover(&self) -> CartResult<usize> {
    let _gate = self.gate.lock().await;
    self.ensure_ready().await?;

    let ctx = SharedState::new(RecoveryData::new(
      self.storage.clone(),
      self.normalizer.clone(),
      self.state.clone(),
    ));
    let outcome = recovery_pipeline().run(ctx.clone()).await?;
    if outcome == RunOutcome::Stopped {
      self.toast(Severity::Info, NOTHING_TO_RECOVER_MESSAGE);
      return Ok(0);
    }

    let (recovered, failure) = {
      let mut data = ctx.write();
      (data.items.len(), data.storage_failure.take())
    };
    if let Some(err) = failure {
      self.report(&CartError::Storage(err), Operation::Recover);
    }
    self.publish_state();
    self.toast(Severity::Success, format!("Recovered {} item(s) from storage", recovered));
    Ok(recovered)
  }

  // --- Internals. Callers hold the gate. ---

  async fn ensure_ready(&self) -> CartResult<()> {
    if self.phase() != CartPhase::Uninitialized {
      return Ok(());
    }
    self.run_startup().await
  }

  #[instrument(name = "CartEngine::startup", skip_all, err(Display))]
  async fn run_startup(&self) -> CartResult<()> {
    let ctx = SharedState::new(StartupData::new(
      self.storage.clone(),
      self.normalizer.clone(),
      self.state.clone(),
    ));

    if let Err(err) = startup_pipeline(self.config.probe_storage).run(ctx.clone()).await {
      // Still usable, just empty and unpersisted.
      let err_report = classify(&err, Operation::Startup);
      event!(Level::ERROR, error = %err, message = err_report.user_message, "Cart startup failed.");
      self.storage.enter_memory_only();
      {
        let mut state = self.state.write();
        state.items.clear();
        state.phase = CartPhase::Ready;
      }
      self.publish_state();
      return Err(err);
    }

    let (probe_error, storage_failure) = {
      let mut data = ctx.write();
      (data.probe_error.take(), data.storage_failure.take())
    };
    if let Some(err) = probe_error {
      classify(&CartError::Storage(err), Operation::Startup);
      self.storage_failure_reported.store(true, Ordering::SeqCst);
      self.toast(Severity::Warning, NOT_PERSISTING_MESSAGE);
    }
    if let Some((operation, err)) = storage_failure {
      self.report(&CartError::Storage(err), operation);
    }
    self.publish_state();
    Ok(())
  }

  async fn add_locked(&self, raw: RawItem, operation: Operation) -> CartResult<LineItem> {
    let item = self.normalizer.normalize(&raw);
    if let Err(reason) = check(&item) {
      let err = CartError::Validation {
        reason: reason.to_string(),
      };
      classify(&err, operation);
      return Err(err);
    }

    let duplicate = self.state.with(|s| s.items.iter().any(|existing| existing.id.loosely_eq(&item.id)));
    if duplicate {
      return Err(self.conflict(
        ConflictKind::DuplicateItem,
        format!("item {} is already in the cart", item.id),
        operation,
      ));
    }

    self.state.write().items.push(item.clone());
    event!(Level::INFO, item_id = %item.id, kind = %item.kind, "Item added to cart.");
    self.persist(operation).await;
    self.publish_state();
    self.toast(Severity::Success, ADDED_MESSAGE);
    Ok(item)
  }

  async fn remove_locked(&self, id: &ItemId, operation: Operation) -> CartResult<()> {
    let removed = {
      let mut state = self.state.write();
      let before = state.items.len();
      state.items.retain(|item| !item.id.loosely_eq(id));
      before - state.items.len()
    };
    if removed == 0 {
      return Err(self.conflict(ConflictKind::ItemNotFound, format!("item {} not found", id), operation));
    }

    event!(Level::INFO, item_id = %id, "Item removed from cart.");
    self.persist(operation).await;
    self.publish_state();
    self.toast(Severity::Info, REMOVED_MESSAGE);
    Ok(())
  }

  async fn clear_locked(&self) {
    let cleared = mem::take(&mut self.state.write().items);
    for key in self.storage.keys().reset_keys() {
      if let Err(err) = self.storage.remove(&key).await {
        event!(Level::WARN, %key, error = %err, "Failed to delete key during cart reset.");
      }
    }
    event!(Level::INFO, cleared = cleared.len(), "Cart cleared.");
    self.publish_state();
    self.toast(Severity::Info, CLEARED_MESSAGE);
  }

  /// Saves the current collection. Failures are reported, not returned.
  async fn persist(&self, operation: Operation) {
    let items = self.items();
    if let Err(err) = self.storage.save(&items).await {
      self.report(&CartError::Storage(err), operation);
    }
  }

  /// Builds a conflict error and announces it.
  fn conflict(&self, kind: ConflictKind, detail: impl Into<String>, operation: Operation) -> CartError {
    let err = CartError::conflict(kind, detail);
    self.report(&err, operation);
    err
  }

  /// Classifies `err` and tells the user what the category calls for.
  fn report(&self, err: &CartError, operation: Operation) {
    let classification = classify(err, operation);
    if classification.fallback == Fallback::MemoryOnly {
      self.storage.enter_memory_only();
    }
    match classification.category {
      ErrorCategory::ValidationFailure => {}
      ErrorCategory::OperationConflict => self.toast(Severity::Error, classification.user_message),
      ErrorCategory::StorageQuotaExceeded | ErrorCategory::StorageAccessDenied | ErrorCategory::StorageGenericFailure => {
        if self.storage_failure_reported.swap(true, Ordering::SeqCst) {
          event!(Level::DEBUG, "Storage failure already reported to the user.");
        } else {
          self.toast(Severity::Error, classification.user_message);
        }
      }
    }
  }

  fn publish_state(&self) {
    self.emit(CartEvent::StateChanged(self.snapshot()));
  }

  fn toast(&self, severity: Severity, message: impl Into<String>) {
    self.emit(CartEvent::Toast(Toast::new(severity, message)));
  }

  fn emit(&self, cart_event: CartEvent) {
    if self.events.send(cart_event).is_err() {
      event!(Level::TRACE, "No event subscribers.");
    }
  }
}
