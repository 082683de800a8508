// coursecart/src/engine/events.rs

//! What the engine tells its host: state changes, toast requests and the
//! navigate-to-checkout signal.

use crate::core::line_item::LineItem;
use crate::pricing::format_price;
use serde::Serialize;
use std::fmt;

/// Lifecycle of an engine within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
  Uninitialized,
  Migrating,
  Loaded,
  Ready,
}

impl fmt::Display for CartPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      CartPhase::Uninitialized => "uninitialized",
      CartPhase::Migrating => "migrating",
      CartPhase::Loaded => "loaded",
      CartPhase::Ready => "ready",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Success,
  Info,
  Warning,
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Severity::Success => "success",
      Severity::Info => "info",
      Severity::Warning => "warning",
      Severity::Error => "error",
    })
  }
}

/// A short user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
  pub message: String,
  pub severity: Severity,
}

impl Toast {
  pub fn new(severity: Severity, message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity,
    }
  }
}

/// Sum of `price * quantity`, starting from `+0.0` so an empty cart totals `0.00`.
pub(crate) fn total_of(items: &[LineItem]) -> f64 {
  items.iter().fold(0.0, |acc, item| acc + item.line_total())
}

/// A read-only copy of the cart at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSnapshot {
  pub items: Vec<LineItem>,
  /// Sum of quantities.
  pub count: u64,
  /// Sum of `price * quantity`.
  pub total: f64,
  #[serde(skip)]
  currency_label: String,
}

impl CartSnapshot {
  pub fn new(items: Vec<LineItem>, currency_label: impl Into<String>) -> Self {
    let count = items.iter().map(|item| u64::from(item.quantity)).sum();
    let total = total_of(&items);
    Self {
      items,
      count,
      total,
      currency_label: currency_label.into(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn formatted_total(&self) -> String {
    format_price(self.total, &self.currency_label)
  }

  pub fn currency_label(&self) -> &str {
    &self.currency_label
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
  StateChanged(CartSnapshot),
  Toast(Toast),
  NavigateToCheckout,
}

/// Everything `debug_report` knows about an engine.
#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
  pub phase: CartPhase,
  pub memory_only: bool,
  pub storage_key: String,
  pub snapshot: CartSnapshot,
  /// Durable keys present in the store, or `None` if listing them failed.
  pub durable_keys: Option<Vec<String>>,
}
