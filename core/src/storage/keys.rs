// coursecart/src/storage/keys.rs

//! The fixed set of storage locations the cart knows about.
//!
//! Earlier site versions kept a single pending course under `enrollCourse`
//! (durable) or `currentCourse` (session), and an alternate cart array in the
//! session area. `bookCart` belongs to the separate book checkout and is never
//! merged into the canonical cart.

use crate::storage::store::StorageKey;

pub const ENROLL_COURSE: &str = "enrollCourse";
pub const CURRENT_COURSE: &str = "currentCourse";
pub const BOOK_CART: &str = "bookCart";
/// Written and removed once at startup to see whether the durable area works.
pub const PROBE_KEY: &str = "__storage_test__";

/// How a location lays out its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
  /// A JSON array of records. Anything else stored there is not cart data.
  List,
  /// One pending record as a JSON object.
  Single,
}

/// A storage location together with the shape its data must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLocation {
  pub key: StorageKey,
  pub shape: RecordShape,
}

impl StoredLocation {
  fn list(key: &StorageKey) -> Self {
    Self {
      key: key.clone(),
      shape: RecordShape::List,
    }
  }

  fn single(key: &StorageKey) -> Self {
    Self {
      key: key.clone(),
      shape: RecordShape::Single,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCatalogue {
  primary: StorageKey,
  session_mirror: StorageKey,
  enroll_course: StorageKey,
  current_course: StorageKey,
  book_cart: StorageKey,
}

impl KeyCatalogue {
  /// Catalogue whose canonical key, and its session-area mirror, is `primary_name`.
  pub fn new(primary_name: &str) -> Self {
    Self {
      primary: StorageKey::durable(primary_name),
      session_mirror: StorageKey::session(primary_name),
      enroll_course: StorageKey::durable(ENROLL_COURSE),
      current_course: StorageKey::session(CURRENT_COURSE),
      book_cart: StorageKey::durable(BOOK_CART),
    }
  }

  pub fn primary(&self) -> &StorageKey {
    &self.primary
  }

  pub fn book_cart(&self) -> &StorageKey {
    &self.book_cart
  }

  pub fn probe(&self) -> StorageKey {
    StorageKey::durable(PROBE_KEY)
  }

  /// Legacy locations in the order the migrator drains them. `bookCart` is
  /// deliberately absent.
  pub fn migration_sources(&self) -> Vec<StoredLocation> {
    vec![
      StoredLocation::single(&self.enroll_course),
      StoredLocation::single(&self.current_course),
      StoredLocation::list(&self.session_mirror),
    ]
  }

  /// Locations tried by recovery, highest priority first.
  pub fn recovery_order(&self) -> Vec<StoredLocation> {
    vec![
      StoredLocation::list(&self.primary),
      StoredLocation::single(&self.enroll_course),
      StoredLocation::single(&self.current_course),
      StoredLocation::list(&self.book_cart),
      StoredLocation::list(&self.session_mirror),
    ]
  }

  /// Everything a full cart reset deletes.
  pub fn reset_keys(&self) -> Vec<StorageKey> {
    vec![
      self.primary.clone(),
      self.enroll_course.clone(),
      self.book_cart.clone(),
      self.session_mirror.clone(),
      self.current_course.clone(),
    ]
  }
}

impl Default for KeyCatalogue {
  fn default() -> Self {
    Self::new("cart")
  }
}
