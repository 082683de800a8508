// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use coursecart::{CartConfig, CartEngine, CartEvent, CartSnapshot, MemoryStore, RawItem, StorageKey, Toast};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Keys ---
pub fn primary_key() -> StorageKey {
  StorageKey::durable("cart")
}
pub fn enroll_course_key() -> StorageKey {
  StorageKey::durable("enrollCourse")
}
pub fn book_cart_key() -> StorageKey {
  StorageKey::durable("bookCart")
}
pub fn current_course_key() -> StorageKey {
  StorageKey::session("currentCourse")
}
pub fn session_cart_key() -> StorageKey {
  StorageKey::session("cart")
}

// --- Engine fixtures ---
pub fn new_store() -> Arc<MemoryStore> {
  Arc::new(MemoryStore::new())
}

pub fn new_engine(store: &Arc<MemoryStore>) -> CartEngine {
  CartEngine::new(store.clone(), CartConfig::default())
}

pub async fn started_engine(store: &Arc<MemoryStore>) -> CartEngine {
  CartEngine::start(store.clone(), CartConfig::default())
    .await
    .expect("engine startup should succeed")
}

// --- Records ---
pub fn course(id: &str, title: &str, price: &str) -> RawItem {
  RawItem::new().with_id(id).with_title(title).with_price(price)
}

pub fn seed_json(store: &MemoryStore, key: &StorageKey, value: Value) {
  store.seed(key, value.to_string());
}

/// The canonical key's contents, parsed. Empty when absent.
pub fn stored_records(store: &MemoryStore) -> Vec<Value> {
  match store.peek(&primary_key()) {
    Some(text) => match serde_json::from_str::<Value>(&text) {
      Ok(Value::Array(records)) => records,
      other => panic!("canonical key does not hold an array: {:?}", other),
    },
    None => Vec::new(),
  }
}

pub fn stored_ids(store: &MemoryStore) -> Vec<Value> {
  stored_records(store).into_iter().map(|r| r["id"].clone()).collect()
}

// --- Events ---
/// Takes every event currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<CartEvent>) -> Vec<CartEvent> {
  let mut events = Vec::new();
  loop {
    match rx.try_recv() {
      Ok(event) => events.push(event),
      Err(TryRecvError::Lagged(skipped)) => {
        tracing::warn!(skipped, "test receiver lagged");
      }
      Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
    }
  }
  events
}

pub fn toasts(events: &[CartEvent]) -> Vec<Toast> {
  events
    .iter()
    .filter_map(|e| match e {
      CartEvent::Toast(t) => Some(t.clone()),
      _ => None,
    })
    .collect()
}

pub fn toast_messages(events: &[CartEvent]) -> Vec<String> {
  toasts(events).into_iter().map(|t| t.message).collect()
}

pub fn last_snapshot(events: &[CartEvent]) -> Option<CartSnapshot> {
  events.iter().rev().find_map(|e| match e {
    CartEvent::StateChanged(s) => Some(s.clone()),
    _ => None,
  })
}

pub fn navigations(events: &[CartEvent]) -> usize {
  events.iter().filter(|e| matches!(e, CartEvent::NavigateToCheckout)).count()
}
