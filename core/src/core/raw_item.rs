// coursecart/src/core/raw_item.rs

//! `RawItem` is the loosely-shaped record the cart accepts from callers, legacy
//! storage keys and recovery scans. Every field is optional; the normalizer
//! turns it into a `LineItem`.

use crate::core::item_id::ItemId;
use crate::core::line_item::LineItem;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A price as it arrives from upstream: already numeric, or text such as
/// `"£45.50"` or `"1,299.50 EGP"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PriceInput {
  Number(f64),
  Text(String),
}

impl From<f64> for PriceInput {
  fn from(n: f64) -> Self {
    PriceInput::Number(n)
  }
}

impl From<i64> for PriceInput {
  fn from(n: i64) -> Self {
    PriceInput::Number(n as f64)
  }
}

impl From<&str> for PriceInput {
  fn from(s: &str) -> Self {
    PriceInput::Text(s.to_string())
  }
}

impl From<String> for PriceInput {
  fn from(s: String) -> Self {
    PriceInput::Text(s)
  }
}

impl From<&Value> for PriceInput {
  fn from(value: &Value) -> Self {
    match value {
      Value::Number(n) => n.as_f64().map_or_else(|| PriceInput::Text(n.to_string()), PriceInput::Number),
      Value::String(s) => PriceInput::Text(s.clone()),
      // Booleans, arrays and objects are kept as their text form; they never parse.
      other => PriceInput::Text(other.to_string()),
    }
  }
}

impl<'de> Deserialize<'de> for PriceInput {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    Ok(PriceInput::from(&value))
  }
}

/// An unnormalized cart record.
///
/// Unknown keys are kept in `extra` so a record read from storage and written
/// back loses nothing. Known fields never fail decoding: a value of the wrong
/// JSON type reads as text when it is a scalar and as absent otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawItem {
  #[serde(deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
  pub id: Option<ItemId>,
  #[serde(deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
  pub course_id: Option<ItemId>,
  #[serde(rename = "type", deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<PriceInput>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<Value>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub instructor: Option<String>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub board: Option<String>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub subject: Option<String>,
  #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
  pub added_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<ItemId>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  Ok(ItemId::from_json(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(deserializer)? {
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  })
}

impl RawItem {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn with_course_id(mut self, id: impl Into<ItemId>) -> Self {
    self.course_id = Some(id.into());
    self
  }

  pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
    self.kind = Some(kind.into());
    self
  }

  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  pub fn with_price(mut self, price: impl Into<PriceInput>) -> Self {
    self.price = Some(price.into());
    self
  }

  pub fn with_quantity(mut self, quantity: u32) -> Self {
    self.quantity = Some(Value::from(quantity));
    self
  }

  pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
    self.instructor = Some(instructor.into());
    self
  }

  pub fn with_author(mut self, author: impl Into<String>) -> Self {
    self.author = Some(author.into());
    self
  }

  pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
    self.subject = Some(subject.into());
    self
  }

  pub fn with_board(mut self, board: impl Into<String>) -> Self {
    self.board = Some(board.into());
    self
  }

  pub fn with_image(mut self, image: impl Into<String>) -> Self {
    self.image = Some(image.into());
    self
  }

  pub fn with_added_at(mut self, added_at: impl Into<String>) -> Self {
    self.added_at = Some(added_at.into());
    self
  }

  /// Reads a stored array, one record per element. Elements that are not
  /// objects become empty records, which validation later discards. Any other
  /// JSON value is not a record list.
  pub fn records_from_array(value: Value) -> Option<Vec<RawItem>> {
    match value {
      Value::Array(elements) => Some(elements.into_iter().map(decode_or_placeholder).collect()),
      _ => None,
    }
  }

  /// Reads one stored record. Only a JSON object qualifies.
  pub fn record_from_object(value: Value) -> Option<RawItem> {
    match value {
      Value::Object(_) => Some(decode_or_placeholder(value)),
      _ => None,
    }
  }
}

fn decode_or_placeholder(value: Value) -> RawItem {
  serde_json::from_value::<RawItem>(value).unwrap_or_else(|err| {
    tracing::warn!(error = %err, "Undecodable cart record; keeping an empty placeholder.");
    RawItem::default()
  })
}

impl From<LineItem> for RawItem {
  fn from(item: LineItem) -> Self {
    RawItem {
      id: Some(item.id),
      course_id: None,
      kind: Some(item.kind.as_str().to_string()),
      title: Some(item.title),
      price: Some(PriceInput::Number(item.price)),
      quantity: Some(Value::from(item.quantity)),
      instructor: item.instructor,
      board: item.board,
      image: item.image,
      author: item.author,
      subject: item.subject,
      added_at: Some(item.added_at),
      extra: Map::new(),
    }
  }
}
