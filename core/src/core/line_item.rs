// coursecart/src/core/line_item.rs

//! The canonical cart line item and its kind.

use crate::core::item_id::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a line item sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Course,
  Book,
}

impl ItemKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ItemKind::Course => "course",
      ItemKind::Book => "book",
    }
  }
}

impl fmt::Display for ItemKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ItemKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "course" => Ok(ItemKind::Course),
      "book" => Ok(ItemKind::Book),
      other => Err(format!("unknown item kind '{}'", other)),
    }
  }
}

/// One entry of the canonical collection.
///
/// Persisted as a JSON object with camelCase keys and the kind under `type`,
/// which is the layout older clients already wrote.
///
/// Only `quantity` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  pub id: ItemId,
  #[serde(rename = "type")]
  pub kind: ItemKind,
  pub title: String,
  pub price: f64,
  pub quantity: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instructor: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub board: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject: Option<String>,
  /// ISO-8601 insertion timestamp.
  pub added_at: String,
}

impl LineItem {
  /// `price × quantity`.
  pub fn line_total(&self) -> f64 {
    self.price * f64::from(self.quantity)
  }

  /// Instructor for courses, author for books; whichever is set.
  pub fn byline(&self) -> Option<&str> {
    self.instructor.as_deref().or(self.author.as_deref())
  }
}
