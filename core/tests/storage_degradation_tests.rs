// tests/storage_degradation_tests.rs
mod common;

use common::*;
use coursecart::{CartConfig, CartEngine, FailureMode, ItemId, MemoryStore, Severity};
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_save_failure_degrades_to_memory_only() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  engine.add_item(course("a", "A", "10")).await.unwrap();
  let mut rx = engine.subscribe();

  store.fail_writes(FailureMode::QuotaExceeded);
  let writes_before = store.set_calls();
  engine.add_item(course("b", "B", "20")).await.unwrap();

  assert!(engine.is_memory_only());
  assert_eq!(store.set_calls(), writes_before + 1);
  assert_eq!(engine.items().len(), 2);
  let events = drain(&mut rx);
  let toasts = toasts(&events);
  assert_eq!(toasts.len(), 2);
  assert_eq!(toasts[0].message, "Cart storage is full. Please clear some items.");
  assert_eq!(toasts[0].severity, Severity::Error);
  assert_eq!(toasts[1].message, "Item added to cart!");
  assert_eq!(last_snapshot(&events).map(|s| s.count), Some(2));
}

#[tokio::test]
#[serial]
async fn test_no_saves_after_degradation_even_when_store_recovers() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  store.fail_writes(FailureMode::AccessDenied);
  engine.add_item(course("a", "A", "10")).await.unwrap();
  let writes_after_failure = store.set_calls();
  store.heal();
  let mut rx = engine.subscribe();

  engine.add_item(course("b", "B", "20")).await.unwrap();
  engine.update_quantity(&ItemId::from("b"), 4).await.unwrap();
  engine.remove_item(&ItemId::from("a")).await.unwrap();

  assert_eq!(store.set_calls(), writes_after_failure);
  assert_eq!(engine.count(), 4);
  let events = drain(&mut rx);
  // Storage trouble is announced once; later operations stay quiet about it.
  assert_eq!(
    toast_messages(&events),
    vec!["Item added to cart!", "Item removed from cart"]
  );
  assert_eq!(last_snapshot(&events).map(|s| s.count), Some(4));
  assert!(stored_records(&store).is_empty());
}

#[tokio::test]
#[serial]
async fn test_failed_probe_starts_in_memory_only_mode() {
  setup_tracing();
  let store = new_store();
  seed_json(&store, &primary_key(), json!([
    {"id": "p1", "type": "course", "title": "Stored", "price": 10, "quantity": 1, "addedAt": "2025-01-01T00:00:00.000Z"}
  ]));
  store.fail_writes(FailureMode::AccessDenied);
  let engine = new_engine(&store);
  let mut rx = engine.subscribe();

  engine.initialize().await.unwrap();

  assert!(engine.is_memory_only());
  assert_eq!(engine.items().len(), 1);
  assert_eq!(store.set_calls(), 1);
  let events = drain(&mut rx);
  let toasts = toasts(&events);
  assert_eq!(toasts.len(), 1);
  assert_eq!(
    toasts[0].message,
    "Cart storage is unavailable. Your cart will not be saved when you leave this page."
  );
  assert_eq!(toasts[0].severity, Severity::Warning);

  engine.add_item(course("a", "A", "5")).await.unwrap();
  assert_eq!(store.set_calls(), 1);
  assert_eq!(engine.items().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_failed_migration_write_keeps_items_in_memory() {
  setup_tracing();
  let store = new_store();
  seed_json(&store, &enroll_course_key(), json!({"id": "e1", "title": "Enrolled", "price": 40}));
  store.fail_writes(FailureMode::Unavailable);
  let config = CartConfig {
    probe_storage: false,
    ..CartConfig::default()
  };
  let engine = CartEngine::new(store.clone(), config);
  let mut rx = engine.subscribe();

  engine.initialize().await.unwrap();

  assert!(engine.is_memory_only());
  assert_eq!(engine.items().len(), 1);
  assert_eq!(engine.items()[0].id, ItemId::from("e1"));
  let messages = toast_messages(&drain(&mut rx));
  assert_eq!(messages, vec!["Failed to save cart. Please try again."]);
}

#[tokio::test]
#[serial]
async fn test_quota_store_overflow_degrades() {
  setup_tracing();
  let store = Arc::new(MemoryStore::with_quota(400));
  let engine = started_engine(&store).await;

  engine
    .add_item(course("a", "A", "10"))
    .await
    .unwrap();
  assert!(!engine.is_memory_only());

  let long_title = "x".repeat(500);
  engine.add_item(course("b", &long_title, "10")).await.unwrap();

  assert!(engine.is_memory_only());
  assert_eq!(engine.items().len(), 2);
  assert_eq!(stored_ids(&store), vec![json!("a")]);
}

#[tokio::test]
#[serial]
async fn test_clear_in_memory_only_mode_still_empties_cart() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  engine.add_item(course("a", "A", "10")).await.unwrap();
  store.fail_writes(FailureMode::QuotaExceeded);
  engine.add_item(course("b", "B", "10")).await.unwrap();

  engine.clear().await.unwrap();
  assert!(engine.items().is_empty());
  assert!(engine.is_memory_only());
}
