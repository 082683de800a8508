// coursecart/src/core/item_id.rs

//! Defines `ItemId`, the identifier of a cart line item.
//!
//! Upstream records carry ids as JSON strings or JSON numbers, sometimes both
//! for the same course. `ItemId` keeps whichever form arrived and offers
//! `ItemId::loosely_eq` for duplicate detection across the two forms.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a line item: either an integer or a text value.
///
/// The derived `PartialEq` is strict (`Number(7) != Text("7")`). Cart
/// membership uses `loosely_eq` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ItemId {
  Number(i64),
  Text(String),
}

impl ItemId {
  /// An id is blank when it is empty text. Blank ids never survive validation.
  pub fn is_blank(&self) -> bool {
    matches!(self, ItemId::Text(s) if s.is_empty())
  }

  /// Coercing equality used for duplicate detection and removal.
  ///
  /// A number and a text id are equal when the text, trimmed, reads as the
  /// same number (`7` equals `"7"` and `" 7.0 "`). Empty text reads as zero, so
  /// `0` equals `""`; blank ids are rejected before they reach a collection, so
  /// that pairing cannot merge two stored items. This compatibility shim keeps
  /// carts working when upstream pages disagree on the id type of a course.
  pub fn loosely_eq(&self, other: &ItemId) -> bool {
    match (self, other) {
      (ItemId::Number(a), ItemId::Number(b)) => a == b,
      (ItemId::Text(a), ItemId::Text(b)) => a == b,
      (ItemId::Number(n), ItemId::Text(s)) | (ItemId::Text(s), ItemId::Number(n)) => {
        coerce_to_number(s).is_some_and(|parsed| parsed == *n as f64)
      }
    }
  }

  /// Reads an id out of an arbitrary JSON value. Integral numbers become
  /// `Number`, other numbers and strings become `Text`. Anything else is not
  /// an id.
  pub fn from_json(value: &Value) -> Option<ItemId> {
    match value {
      Value::Number(n) => match n.as_i64() {
        Some(i) => Some(ItemId::Number(i)),
        None => Some(ItemId::Text(n.to_string())),
      },
      Value::String(s) => Some(ItemId::Text(s.clone())),
      _ => None,
    }
  }
}

fn coerce_to_number(text: &str) -> Option<f64> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Some(0.0);
  }
  trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl Default for ItemId {
  fn default() -> Self {
    ItemId::Text(String::new())
  }
}

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ItemId::Number(n) => write!(f, "{}", n),
      ItemId::Text(s) => f.write_str(s),
    }
  }
}

impl From<i64> for ItemId {
  fn from(n: i64) -> Self {
    ItemId::Number(n)
  }
}

impl From<&str> for ItemId {
  fn from(s: &str) -> Self {
    ItemId::Text(s.to_string())
  }
}

impl From<String> for ItemId {
  fn from(s: String) -> Self {
    ItemId::Text(s)
  }
}

impl<'de> Deserialize<'de> for ItemId {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    ItemId::from_json(&value).ok_or_else(|| de::Error::custom(format!("unsupported item id: {}", value)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn numeric_and_text_forms_are_loosely_equal() {
    assert!(ItemId::from(7_i64).loosely_eq(&ItemId::from("7")));
    assert!(ItemId::from("7").loosely_eq(&ItemId::from(7_i64)));
    assert!(ItemId::from(7_i64).loosely_eq(&ItemId::from(" 7.0 ")));
    assert!(!ItemId::from(7_i64).loosely_eq(&ItemId::from("07a")));
    assert_ne!(ItemId::from(7_i64), ItemId::from("7"));
  }

  #[test]
  fn text_ids_compare_exactly() {
    assert!(ItemId::from("math-101").loosely_eq(&ItemId::from("math-101")));
    assert!(!ItemId::from("math-101").loosely_eq(&ItemId::from("MATH-101")));
  }

  #[test]
  fn empty_text_coerces_to_zero() {
    assert!(ItemId::from(0_i64).loosely_eq(&ItemId::from("")));
    assert!(ItemId::from("").is_blank());
    assert!(!ItemId::from(0_i64).is_blank());
  }

  #[test]
  fn deserializes_numbers_and_strings() {
    let n: ItemId = serde_json::from_value(json!(42)).unwrap();
    assert_eq!(n, ItemId::Number(42));
    let f: ItemId = serde_json::from_value(json!(4.5)).unwrap();
    assert_eq!(f, ItemId::Text("4.5".into()));
    let s: ItemId = serde_json::from_value(json!("bio-7")).unwrap();
    assert_eq!(s, ItemId::Text("bio-7".into()));
    assert!(serde_json::from_value::<ItemId>(json!(true)).is_err());
  }

  #[test]
  fn serializes_untagged() {
    assert_eq!(serde_json::to_value(ItemId::from(3_i64)).unwrap(), json!(3));
    assert_eq!(serde_json::to_value(ItemId::from("x")).unwrap(), json!("x"));
  }
}
