// tests/recovery_tests.rs
mod common;

use common::*;
use coursecart::recovery::attempt_recovery;
use coursecart::{CartStorage, ItemId, KeyCatalogue, Severity};
use serde_json::json;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_scan_prefers_primary_key() {
  setup_tracing();
  let store = new_store();
  seed_json(&store, &primary_key(), json!([{"id": "primary", "title": "P", "price": 1}]));
  seed_json(&store, &enroll_course_key(), json!({"id": "legacy", "title": "L", "price": 2}));
  let storage = CartStorage::new(store.clone(), KeyCatalogue::default());

  let found = attempt_recovery(&storage).await.expect("data should be found");
  assert_eq!(found.source, primary_key());
  assert_eq!(found.records.len(), 1);
  assert_eq!(found.records[0].id, Some(ItemId::from("primary")));
}

#[tokio::test]
#[serial]
async fn test_scan_walks_priority_order() {
  setup_tracing();
  let store = new_store();
  let storage = CartStorage::new(store.clone(), KeyCatalogue::default());

  seed_json(&store, &session_cart_key(), json!([{"id": "s"}]));
  assert_eq!(attempt_recovery(&storage).await.unwrap().source, session_cart_key());

  seed_json(&store, &book_cart_key(), json!([{"id": "b"}]));
  assert_eq!(attempt_recovery(&storage).await.unwrap().source, book_cart_key());

  seed_json(&store, &current_course_key(), json!({"id": "c"}));
  assert_eq!(attempt_recovery(&storage).await.unwrap().source, current_course_key());

  seed_json(&store, &enroll_course_key(), json!({"id": "e"}));
  assert_eq!(attempt_recovery(&storage).await.unwrap().source, enroll_course_key());

  // An empty array at the primary key does not count.
  seed_json(&store, &primary_key(), json!([]));
  assert_eq!(attempt_recovery(&storage).await.unwrap().source, enroll_course_key());
}

#[tokio::test]
#[serial]
async fn test_scan_skips_corrupt_locations() {
  setup_tracing();
  let store = new_store();
  store.seed(&primary_key(), "[{broken");
  seed_json(&store, &enroll_course_key(), json!(42));
  seed_json(&store, &book_cart_key(), json!([{"id": "b", "title": "Book", "price": 9}]));
  let storage = CartStorage::new(store.clone(), KeyCatalogue::default());

  let found = attempt_recovery(&storage).await.unwrap();
  assert_eq!(found.source, book_cart_key());
}

#[tokio::test]
#[serial]
async fn test_scan_with_nothing_returns_none() {
  setup_tracing();
  let store = new_store();
  let storage = CartStorage::new(store.clone(), KeyCatalogue::default());
  assert!(attempt_recovery(&storage).await.is_none());
}

#[tokio::test]
#[serial]
async fn test_recover_replaces_cart_from_book_cart() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  engine.clear().await.unwrap();
  seed_json(&store, &book_cart_key(), json!([
    {"id": "b1", "title": "Physics Book", "price": "£25", "author": "Someone"},
    {"id": "b1", "title": "Physics Book (dup)", "price": "£25"},
    {"id": "b2", "title": "Chemistry Book", "price": "30 EGP", "quantity": 2}
  ]));
  let mut rx = engine.subscribe();

  let recovered = engine.recover().await.unwrap();

  assert_eq!(recovered, 2);
  let items = engine.items();
  assert_eq!(items.len(), 2);
  assert_eq!(items[0].price, 25.0);
  assert_eq!(engine.count(), 3);
  assert_eq!(stored_ids(&store), vec![json!("b1"), json!("b2")]);

  let events = drain(&mut rx);
  let toasts = toasts(&events);
  assert_eq!(toasts.len(), 1);
  assert_eq!(toasts[0].message, "Recovered 2 item(s) from storage");
  assert_eq!(toasts[0].severity, Severity::Success);
  assert_eq!(last_snapshot(&events).map(|s| s.count), Some(3));
}

#[tokio::test]
#[serial]
async fn test_recover_with_nothing_leaves_cart_alone() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  let mut rx = engine.subscribe();

  assert_eq!(engine.recover().await.unwrap(), 0);

  let events = drain(&mut rx);
  let toasts = toasts(&events);
  assert_eq!(toasts.len(), 1);
  assert_eq!(toasts[0].message, "No cart data found to recover");
  assert_eq!(toasts[0].severity, Severity::Info);
  assert!(last_snapshot(&events).is_none());
}

#[tokio::test]
#[serial]
async fn test_recover_ignores_all_invalid_data() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  engine.add_item(course("keep", "Keep me", "10")).await.unwrap();
  // Primary now holds a valid cart, so plant the bad data where the scan
  // reaches it first by replacing the primary contents directly.
  seed_json(&store, &primary_key(), json!([{"id": "bad", "title": "Bad", "price": -5}]));

  assert_eq!(engine.recover().await.unwrap(), 0);
  assert_eq!(engine.items().len(), 1);
  assert_eq!(engine.items()[0].id, ItemId::from("keep"));
}

#[tokio::test]
#[serial]
async fn test_scan_requires_arrays_at_list_locations() {
  setup_tracing();
  let store = new_store();
  seed_json(&store, &primary_key(), json!({"id": "obj", "type": "course", "title": "Obj", "price": 1}));
  seed_json(&store, &book_cart_key(), json!({"id": "book-obj", "title": "Book", "price": 2}));
  let storage = CartStorage::new(store.clone(), KeyCatalogue::default());

  assert!(attempt_recovery(&storage).await.is_none());

  seed_json(&store, &session_cart_key(), json!([{"id": "s", "title": "S", "price": 3}]));
  assert_eq!(attempt_recovery(&storage).await.unwrap().source, session_cart_key());
}

#[tokio::test]
#[serial]
async fn test_object_under_primary_key_loads_as_empty_cart() {
  setup_tracing();
  let store = new_store();
  seed_json(&store, &primary_key(), json!({"id": "obj", "type": "course", "title": "Obj", "price": 1}));

  let engine = started_engine(&store).await;
  assert!(engine.items().is_empty());
}

#[tokio::test]
#[serial]
async fn test_recover_prefers_primary_over_legacy_key() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  // Plant data after startup so migration does not drain the legacy key first.
  seed_json(&store, &primary_key(), json!([
    {"id": "primary", "type": "course", "title": "From primary", "price": 15}
  ]));
  seed_json(&store, &enroll_course_key(), json!({"id": "legacy", "title": "From legacy", "price": 25}));

  assert_eq!(engine.recover().await.unwrap(), 1);

  let items = engine.items();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].id, ItemId::from("primary"));
  assert!(store.contains(&enroll_course_key()));
  assert_eq!(stored_ids(&store), vec![json!("primary")]);
}

#[tokio::test]
#[serial]
async fn test_recover_falls_back_to_legacy_single_record() {
  setup_tracing();
  let store = new_store();
  let engine = started_engine(&store).await;
  seed_json(&store, &enroll_course_key(), json!({"id": "legacy", "title": "From legacy", "price": "£25"}));
  seed_json(&store, &book_cart_key(), json!([{"id": "b", "title": "Book", "price": 9}]));

  assert_eq!(engine.recover().await.unwrap(), 1);
  assert_eq!(engine.items()[0].id, ItemId::from("legacy"));
  assert_eq!(engine.total(), 25.0);
}
