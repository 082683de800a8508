// coursecart/src/normalize.rs

//! The item normalizer: turns any `RawItem` into a structurally complete
//! `LineItem`. It never fails; semantic checks belong to `validate`.

use crate::core::item_id::ItemId;
use crate::core::line_item::{ItemKind, LineItem};
use crate::core::raw_item::{PriceInput, RawItem};
use crate::pricing::parse_price;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub const DEFAULT_PLACEHOLDER_TITLE: &str = "Unknown Item";

/// Formats a timestamp the way stored carts carry `addedAt`: RFC 3339 with
/// millisecond precision and a `Z` suffix.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub struct Normalizer {
  placeholder_title: String,
}

impl Default for Normalizer {
  fn default() -> Self {
    Self::new(DEFAULT_PLACEHOLDER_TITLE)
  }
}

impl Normalizer {
  pub fn new(placeholder_title: impl Into<String>) -> Self {
    Self {
      placeholder_title: placeholder_title.into(),
    }
  }

  /// Normalizes `raw`, stamping `addedAt` with the current time if absent.
  pub fn normalize(&self, raw: &RawItem) -> LineItem {
    self.normalize_at(raw, Utc::now())
  }

  /// Normalizes `raw`, using `now` for a missing `addedAt`.
  pub fn normalize_at(&self, raw: &RawItem, now: DateTime<Utc>) -> LineItem {
    // id, then courseId, then title; blank values fall through to the next source.
    let id = [raw.id.clone(), raw.course_id.clone(), raw.title.clone().map(ItemId::Text)]
      .into_iter()
      .flatten()
      .find(|candidate| !candidate.is_blank())
      .unwrap_or_default();

    let kind = match raw.kind.as_deref().and_then(|k| k.parse::<ItemKind>().ok()) {
      Some(kind) => kind,
      None if raw.author.is_some() => ItemKind::Book,
      None => ItemKind::Course,
    };

    let title = raw
      .title
      .clone()
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| self.placeholder_title.clone());

    let price = parse_price(raw.price.clone().unwrap_or(PriceInput::Number(0.0)));

    let quantity = raw.quantity.as_ref().and_then(positive_quantity).unwrap_or(1);

    let added_at = raw
      .added_at
      .clone()
      .filter(|a| !a.is_empty())
      .unwrap_or_else(|| iso_timestamp(now));

    LineItem {
      id,
      kind,
      title,
      price,
      quantity,
      instructor: raw.instructor.clone(),
      board: raw.board.clone(),
      image: raw.image.clone(),
      author: raw.author.clone(),
      subject: raw.subject.clone(),
      added_at,
    }
  }
}

/// Normalizes with the default placeholder title.
pub fn normalize(raw: &RawItem) -> LineItem {
  Normalizer::default().normalize(raw)
}

/// A positive whole number that fits `u32`; anything else is not a quantity.
pub(crate) fn positive_quantity(value: &Value) -> Option<u32> {
  if let Some(n) = value.as_u64() {
    return u32::try_from(n).ok().filter(|q| *q >= 1);
  }
  let f = value.as_f64()?;
  if f.is_finite() && f >= 1.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
    Some(f as u32)
  } else {
    None
  }
}
