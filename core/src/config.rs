// coursecart/src/config.rs

use crate::error::{CartError, CartResult};
use crate::normalize::DEFAULT_PLACEHOLDER_TITLE;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_STORAGE_KEY: &str = "cart";
pub const DEFAULT_CURRENCY_LABEL: &str = "EGP";
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct CartConfig {
  /// Name of the canonical durable key.
  pub storage_key: String,
  /// Appended to formatted prices.
  pub currency_label: String,
  /// Title given to items that arrive without one.
  pub placeholder_title: String,
  /// Root of the durable file store, for hosts that use one.
  pub data_dir: Option<PathBuf>,
  /// Whether startup writes a throwaway key to check the store works.
  pub probe_storage: bool,
  /// Buffer size of the event channel. Slow subscribers lag past this.
  pub event_capacity: usize,
}

impl Default for CartConfig {
  fn default() -> Self {
    Self {
      storage_key: DEFAULT_STORAGE_KEY.to_string(),
      currency_label: DEFAULT_CURRENCY_LABEL.to_string(),
      placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
      data_dir: None,
      probe_storage: true,
      event_capacity: DEFAULT_EVENT_CAPACITY,
    }
  }
}

impl CartConfig {
  /// Reads the configuration from the process environment, loading `.env`
  /// first if present. Absent variables keep their defaults.
  pub fn from_env() -> CartResult<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds a configuration from an arbitrary variable lookup.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CartResult<Self> {
    let defaults = Self::default();
    let get_text = |var_name: &str, default: String| match lookup(var_name) {
      Some(value) if !value.trim().is_empty() => value,
      _ => default,
    };

    let storage_key = get_text("CART_STORAGE_KEY", defaults.storage_key);
    let currency_label = get_text("CART_CURRENCY", defaults.currency_label);
    let placeholder_title = get_text("CART_PLACEHOLDER_TITLE", defaults.placeholder_title);
    let data_dir = lookup("CART_DATA_DIR")
      .filter(|value| !value.trim().is_empty())
      .map(PathBuf::from);
    let probe_storage = parse_var(&lookup, "CART_PROBE_STORAGE", defaults.probe_storage)?;
    let event_capacity = parse_var(&lookup, "CART_EVENT_CAPACITY", defaults.event_capacity)?;
    if event_capacity == 0 {
      return Err(CartError::Config("Invalid CART_EVENT_CAPACITY: must be at least 1".to_string()));
    }

    tracing::info!("Cart configuration loaded successfully.");
    tracing::debug!(%storage_key, %currency_label, ?data_dir, probe_storage, event_capacity, "Loaded cart config.");

    Ok(Self {
      storage_key,
      currency_label,
      placeholder_title,
      data_dir,
      probe_storage,
      event_capacity,
    })
  }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var_name: &str, default: T) -> CartResult<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(var_name) {
    Some(raw) if !raw.trim().is_empty() => raw
      .trim()
      .parse::<T>()
      .map_err(|e| CartError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    _ => Ok(default),
  }
}
