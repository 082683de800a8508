// coursecart/src/pricing.rs

//! Price parsing and display.
//!
//! Upstream pages hand prices over as raw numbers, `"£45.50"`, `"1,299.50 EGP"`
//! or with the pound sign mangled by one or two rounds of mis-decoding.
//! `parse_price` reduces all of these to a plain number and never fails.

use crate::core::raw_item::PriceInput;

/// Currency markers stripped before parsing. Longer mis-decoded forms come
/// first so their trailing `£` is not removed on its own, leaving debris.
const CURRENCY_MARKERS: [&str; 4] = ["Ã‚Â£", "Â£", "£", "EGP"];

/// Extracts a numeric amount from a mixed price representation.
///
/// Numbers pass through unchanged. Text has its currency markers and
/// thousands separators removed and is read like a decimal literal prefix
/// (`"12.5 per month"` reads as `12.5`). Anything that does not yield a
/// finite number, including NaN and infinities, becomes `0`.
pub fn parse_price(input: impl Into<PriceInput>) -> f64 {
  match input.into() {
    PriceInput::Number(n) => finite_or_zero(n),
    PriceInput::Text(text) => {
      let mut cleaned = text;
      for marker in CURRENCY_MARKERS {
        if cleaned.contains(marker) {
          cleaned = cleaned.replace(marker, "");
        }
      }
      let cleaned = cleaned.replace(',', "");
      leading_decimal(cleaned.trim()).map_or(0.0, finite_or_zero)
    }
  }
}

/// Renders an amount with two decimals followed by the currency label, e.g. `299.00 EGP`.
pub fn format_price(amount: f64, currency_label: &str) -> String {
  // `+ 0.0` turns a negative zero into zero.
  format!("{:.2} {}", amount + 0.0, currency_label)
}

fn finite_or_zero(n: f64) -> f64 {
  // -0.0 is folded to 0.0 as well.
  if n.is_finite() && n != 0.0 {
    n
  } else {
    0.0
  }
}

/// Parses the longest prefix of `text` that forms a decimal literal:
/// optional sign, digits, optional fraction, optional exponent.
fn leading_decimal(text: &str) -> Option<f64> {
  let bytes = text.as_bytes();
  let mut end = 0;

  if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
    end += 1;
  }
  let int_start = end;
  while end < bytes.len() && bytes[end].is_ascii_digit() {
    end += 1;
  }
  let mut digits = end - int_start;

  if end < bytes.len() && bytes[end] == b'.' {
    let frac_start = end + 1;
    let mut frac_end = frac_start;
    while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
      frac_end += 1;
    }
    digits += frac_end - frac_start;
    end = frac_end;
  }

  if digits == 0 {
    return None;
  }

  if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
    let mut exp_end = end + 1;
    if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
      exp_end += 1;
    }
    let exp_digits_start = exp_end;
    while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
      exp_end += 1;
    }
    if exp_end > exp_digits_start {
      end = exp_end;
    }
  }

  text[..end].parse::<f64>().ok()
}
