// coursecart/src/validate.rs

//! The validator. Filters cart contents down to structurally valid items.
//!
//! Invalid items are dropped whole and logged; they are never repaired and
//! never block the rest of the cart.

use crate::core::item_id::ItemId;
use crate::core::line_item::{ItemKind, LineItem};
use crate::core::raw_item::{PriceInput, RawItem};
use crate::normalize::{iso_timestamp, positive_quantity};
use chrono::Utc;
use std::fmt;
use tracing::{event, Level};

/// Why an item was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
  MissingId,
  MissingType,
  MissingTitle,
  InvalidPrice,
  InvalidQuantity,
}

impl fmt::Display for InvalidReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      InvalidReason::MissingId => "missing id",
      InvalidReason::MissingType => "missing type",
      InvalidReason::MissingTitle => "missing title",
      InvalidReason::InvalidPrice => "invalid price",
      InvalidReason::InvalidQuantity => "invalid quantity",
    })
  }
}

/// Result of a validation pass: the surviving items, in their original order,
/// and how many were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
  pub items: Vec<LineItem>,
  pub dropped: usize,
}

impl Validated {
  pub fn changed(&self) -> bool {
    self.dropped > 0
  }
}

/// Checks one item. The first failing rule wins.
pub fn check(item: &LineItem) -> Result<(), InvalidReason> {
  if item.id.is_blank() {
    return Err(InvalidReason::MissingId);
  }
  if item.title.is_empty() {
    return Err(InvalidReason::MissingTitle);
  }
  if !valid_price(item.price) {
    return Err(InvalidReason::InvalidPrice);
  }
  if item.quantity == 0 {
    return Err(InvalidReason::InvalidQuantity);
  }
  Ok(())
}

/// Keeps the items that pass `check`. Never adds or reorders.
pub fn validate(items: Vec<LineItem>) -> Validated {
  let before = items.len();
  let kept: Vec<LineItem> = items
    .into_iter()
    .filter(|item| match check(item) {
      Ok(()) => true,
      Err(reason) => {
        event!(Level::WARN, item_id = %item.id, %reason, "Validation failed for item; dropping it.");
        false
      }
    })
    .collect();
  let dropped = before - kept.len();
  if dropped > 0 {
    event!(Level::INFO, dropped, "Removed invalid items.");
  }
  Validated { items: kept, dropped }
}

/// Admits records read back from the canonical key.
///
/// Stored records are expected to be canonical already, so nothing is
/// normalized: a record whose price is not a number, or whose type is not a
/// known kind, is dropped rather than coerced. Two fields get defaults: a
/// missing quantity reads as 1 and a missing `addedAt` is stamped now.
pub fn admit(records: Vec<RawItem>) -> Validated {
  let before = records.len();
  let mut items = Vec::with_capacity(before);
  for record in records {
    match admit_one(record) {
      Ok(item) => items.push(item),
      Err((id, reason)) => {
        event!(Level::WARN, item_id = ?id, %reason, "Validation failed for stored record; dropping it.");
      }
    }
  }
  let checked = validate(items);
  let dropped = before - checked.items.len();
  if dropped > 0 {
    event!(Level::INFO, dropped, "Removed invalid stored records.");
  }
  Validated {
    items: checked.items,
    dropped,
  }
}

fn admit_one(record: RawItem) -> Result<LineItem, (Option<ItemId>, InvalidReason)> {
  let RawItem {
    id,
    kind,
    title,
    price,
    quantity,
    instructor,
    board,
    image,
    author,
    subject,
    added_at,
    ..
  } = record;

  let id = match id {
    Some(id) if !id.is_blank() => id,
    other => return Err((other, InvalidReason::MissingId)),
  };
  let kind = match kind.as_deref().map(str::parse::<ItemKind>) {
    Some(Ok(kind)) => kind,
    _ => return Err((Some(id), InvalidReason::MissingType)),
  };
  let title = match title {
    Some(title) if !title.is_empty() => title,
    _ => return Err((Some(id), InvalidReason::MissingTitle)),
  };
  let price = match price {
    Some(PriceInput::Number(n)) if valid_price(n) => n,
    _ => return Err((Some(id), InvalidReason::InvalidPrice)),
  };
  let quantity = match quantity {
    None => 1,
    Some(value) => match positive_quantity(&value) {
      Some(q) => q,
      None => return Err((Some(id), InvalidReason::InvalidQuantity)),
    },
  };
  let added_at = added_at
    .filter(|a| !a.is_empty())
    .unwrap_or_else(|| iso_timestamp(Utc::now()));

  Ok(LineItem {
    id,
    kind,
    title,
    price,
    quantity,
    instructor,
    board,
    image,
    author,
    subject,
    added_at,
  })
}

fn valid_price(price: f64) -> bool {
  price.is_finite() && price >= 0.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalize::normalize;
  use serde_json::json;

  fn item(id: &str, title: &str, price: f64) -> LineItem {
    let mut item = normalize(&RawItem::new().with_price(price));
    item.id = ItemId::from(id);
    item.title = title.to_string();
    item
  }

  #[test]
  fn keeps_valid_items_in_order() {
    let items = vec![item("a", "A", 1.0), item("", "B", 2.0), item("c", "C", 3.0), item("d", "", 1.0)];
    let out = validate(items);
    assert_eq!(out.dropped, 2);
    let ids: Vec<String> = out.items.iter().map(|i| i.id.to_string()).collect();
    assert_eq!(ids, vec!["a", "c"]);
  }

  #[test]
  fn rejects_negative_price() {
    assert_eq!(check(&item("a", "A", -1.0)), Err(InvalidReason::InvalidPrice));
    assert_eq!(check(&item("a", "A", 0.0)), Ok(()));
  }

  #[test]
  fn admission_drops_non_canonical_records() {
    let records = RawItem::records_from_array(json!([
      { "id": "ok", "type": "course", "title": "Fine", "price": 10, "addedAt": "2025-01-01T00:00:00.000Z" },
      { "id": "str-price", "type": "course", "title": "Nope", "price": "10" },
      { "type": "course", "title": "No id", "price": 1 },
      { "id": "no-type", "title": "T", "price": 1 },
      { "id": "bad-qty", "type": "book", "title": "T", "price": 1, "quantity": -2 },
      "not an object"
    ]))
    .unwrap();

    let out = admit(records);
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.dropped, 5);
    assert_eq!(out.items[0].id, ItemId::from("ok"));
    assert_eq!(out.items[0].quantity, 1);
    assert_eq!(out.items[0].added_at, "2025-01-01T00:00:00.000Z");
  }

  #[test]
  fn admission_of_clean_records_changes_nothing() {
    let stored = vec![RawItem::from(item("a", "A", 5.0)), RawItem::from(item("b", "B", 7.5))];
    let out = admit(stored);
    assert!(!out.changed());
    assert_eq!(out.items.len(), 2);
  }
}
