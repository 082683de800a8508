// tests/config_tests.rs
mod common;

use common::*;
use coursecart::{CartConfig, CartError};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

const VARS: [&str; 6] = [
  "CART_STORAGE_KEY",
  "CART_CURRENCY",
  "CART_PLACEHOLDER_TITLE",
  "CART_DATA_DIR",
  "CART_PROBE_STORAGE",
  "CART_EVENT_CAPACITY",
];

fn clear_vars() {
  for var in VARS {
    env::remove_var(var);
  }
}

#[test]
#[serial]
fn test_from_env_reads_process_environment() {
  setup_tracing();
  clear_vars();
  env::set_var("CART_CURRENCY", "USD");
  env::set_var("CART_DATA_DIR", "/var/lib/cart");
  env::set_var("CART_PROBE_STORAGE", "false");

  let config = CartConfig::from_env().unwrap();
  clear_vars();

  assert_eq!(config.currency_label, "USD");
  assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/cart")));
  assert!(!config.probe_storage);
  assert_eq!(config.storage_key, "cart");
  assert_eq!(config.event_capacity, 64);
}

#[test]
#[serial]
fn test_from_env_rejects_bad_capacity() {
  setup_tracing();
  clear_vars();
  env::set_var("CART_EVENT_CAPACITY", "lots");

  let result = CartConfig::from_env();
  clear_vars();

  match result {
    Err(CartError::Config(msg)) => assert!(msg.contains("CART_EVENT_CAPACITY")),
    other => panic!("expected a config error, got {:?}", other),
  }
}
