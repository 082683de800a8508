// coursecart/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failure reported by a `KeyValueStore` or by the persistence adapter on top of it.
#[derive(Debug, Error)]
pub enum StorageError {
  #[error("Storage quota exceeded while writing '{key}'")]
  QuotaExceeded { key: String },

  #[error("Storage access denied for '{key}'")]
  AccessDenied { key: String },

  #[error("Storage unavailable for '{key}'. Source: {source}")]
  Unavailable {
    key: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Storage I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// The conflicts a cart operation can run into. Each one is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
  DuplicateItem,
  ItemNotFound,
  InvalidQuantity,
  EmptyCartCheckout,
}

impl ConflictKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ConflictKind::DuplicateItem => "add_duplicate",
      ConflictKind::ItemNotFound => "remove_not_found",
      ConflictKind::InvalidQuantity => "invalid_quantity",
      ConflictKind::EmptyCartCheckout => "empty_cart_checkout",
    }
  }
}

impl std::fmt::Display for ConflictKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum CartError {
  #[error(transparent)]
  Storage(#[from] StorageError),

  #[error("Item failed validation: {reason}")]
  Validation { reason: String },

  #[error("Cart operation conflict ({kind}): {detail}")]
  Conflict { kind: ConflictKind, detail: String },

  #[error("Cart serialization failed: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Error in external operation. Source: {source}")]
  External {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal cart engine error: {0}")]
  Internal(String),
}

impl CartError {
  pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
    CartError::Conflict {
      kind,
      detail: detail.into(),
    }
  }

  /// The conflict kind, if this error is an operation conflict.
  pub fn conflict_kind(&self) -> Option<ConflictKind> {
    match self {
      CartError::Conflict { kind, .. } => Some(*kind),
      _ => None,
    }
  }
}

impl From<AnyhowError> for CartError {
  fn from(err: AnyhowError) -> Self {
    // Unwrap a StorageError carried inside anyhow so it still classifies as storage.
    match err.downcast::<StorageError>() {
      Ok(storage_err) => CartError::Storage(storage_err),
      Err(err) => CartError::External { source: err },
    }
  }
}

pub type CartResult<T, E = CartError> = std::result::Result<T, E>;
