// coursecart/src/classify.rs

//! The error classifier. Maps any `CartError` onto a closed set of categories,
//! each with a stable user-facing message and a recommended fallback.
//!
//! Advisory only: callers decide what to do with the answer.

use crate::error::{CartError, ConflictKind, StorageError};
use std::fmt;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
  StorageQuotaExceeded,
  StorageAccessDenied,
  StorageGenericFailure,
  ValidationFailure,
  OperationConflict,
}

/// What the caller is advised to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
  /// Keep working on the in-memory collection without persisting.
  MemoryOnly,
  /// Drop the offending item and carry on with the rest.
  DropItem,
  /// Leave the cart as it was.
  KeepState,
}

/// The operation during which an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Startup,
  Migrate,
  Load,
  Save,
  Add,
  Remove,
  UpdateQuantity,
  Clear,
  EnrollNow,
  Checkout,
  Recover,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Operation::Startup => "startup",
      Operation::Migrate => "migrate",
      Operation::Load => "load",
      Operation::Save => "save",
      Operation::Add => "add",
      Operation::Remove => "remove",
      Operation::UpdateQuantity => "update_quantity",
      Operation::Clear => "clear",
      Operation::EnrollNow => "enroll_now",
      Operation::Checkout => "checkout",
      Operation::Recover => "recover",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub category: ErrorCategory,
  pub user_message: &'static str,
  pub fallback: Fallback,
}

pub const QUOTA_MESSAGE: &str = "Cart storage is full. Please clear some items.";
pub const ACCESS_DENIED_MESSAGE: &str = "Cart storage is disabled. Please enable cookies and try again.";
pub const STORAGE_FAILURE_MESSAGE: &str = "Failed to save cart. Please try again.";
pub const VALIDATION_MESSAGE: &str = "Some cart items were invalid and have been removed.";

/// User message for an operation conflict.
pub fn conflict_message(kind: ConflictKind) -> &'static str {
  match kind {
    ConflictKind::DuplicateItem => "This item is already in your cart",
    ConflictKind::ItemNotFound => "Item not found in cart",
    ConflictKind::InvalidQuantity => "Please enter a valid quantity",
    ConflictKind::EmptyCartCheckout => "Your cart is empty",
  }
}

pub fn classify_storage(error: &StorageError) -> Classification {
  match error {
    StorageError::QuotaExceeded { .. } => Classification {
      category: ErrorCategory::StorageQuotaExceeded,
      user_message: QUOTA_MESSAGE,
      fallback: Fallback::MemoryOnly,
    },
    StorageError::AccessDenied { .. } => Classification {
      category: ErrorCategory::StorageAccessDenied,
      user_message: ACCESS_DENIED_MESSAGE,
      fallback: Fallback::MemoryOnly,
    },
    StorageError::Unavailable { .. } | StorageError::Io(_) => Classification {
      category: ErrorCategory::StorageGenericFailure,
      user_message: STORAGE_FAILURE_MESSAGE,
      fallback: Fallback::MemoryOnly,
    },
  }
}

/// Classifies `error` raised during `operation` and logs it.
pub fn classify(error: &CartError, operation: Operation) -> Classification {
  let classification = match error {
    CartError::Storage(storage_err) => classify_storage(storage_err),
    CartError::Serialization(_) => Classification {
      category: ErrorCategory::StorageGenericFailure,
      user_message: STORAGE_FAILURE_MESSAGE,
      fallback: Fallback::MemoryOnly,
    },
    CartError::Validation { .. } => Classification {
      category: ErrorCategory::ValidationFailure,
      user_message: VALIDATION_MESSAGE,
      fallback: Fallback::DropItem,
    },
    CartError::Conflict { kind, .. } => Classification {
      category: ErrorCategory::OperationConflict,
      user_message: conflict_message(*kind),
      fallback: Fallback::KeepState,
    },
    // Faults outside the cart's own rules leave the cart untouched.
    CartError::Config(_) | CartError::External { .. } | CartError::Internal(_) => Classification {
      category: ErrorCategory::StorageGenericFailure,
      user_message: STORAGE_FAILURE_MESSAGE,
      fallback: Fallback::KeepState,
    },
  };

  match classification.category {
    ErrorCategory::ValidationFailure => {
      event!(Level::WARN, %operation, error = %error, "Cart validation failure.")
    }
    ErrorCategory::OperationConflict => {
      event!(Level::WARN, %operation, error = %error, "Cart operation conflict.")
    }
    _ => event!(Level::ERROR, %operation, error = %error, category = ?classification.category, "Cart storage error."),
  }
  classification
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;

  #[test]
  fn storage_errors_recommend_memory_only() {
    let quota = CartError::from(StorageError::QuotaExceeded { key: "durable:cart".into() });
    let c = classify(&quota, Operation::Save);
    assert_eq!(c.category, ErrorCategory::StorageQuotaExceeded);
    assert_eq!(c.user_message, QUOTA_MESSAGE);
    assert_eq!(c.fallback, Fallback::MemoryOnly);

    let denied = CartError::from(StorageError::AccessDenied { key: "durable:cart".into() });
    assert_eq!(classify(&denied, Operation::Save).category, ErrorCategory::StorageAccessDenied);

    let other = CartError::from(StorageError::Unavailable {
      key: "durable:cart".into(),
      source: anyhow!("disk on fire"),
    });
    let c = classify(&other, Operation::Save);
    assert_eq!(c.category, ErrorCategory::StorageGenericFailure);
    assert!(!c.user_message.contains("disk on fire"));
  }

  #[test]
  fn conflicts_have_specific_messages() {
    let kinds = [
      (ConflictKind::DuplicateItem, "This item is already in your cart"),
      (ConflictKind::ItemNotFound, "Item not found in cart"),
      (ConflictKind::InvalidQuantity, "Please enter a valid quantity"),
      (ConflictKind::EmptyCartCheckout, "Your cart is empty"),
    ];
    for (kind, message) in kinds {
      let c = classify(&CartError::conflict(kind, "detail"), Operation::Add);
      assert_eq!(c.category, ErrorCategory::OperationConflict);
      assert_eq!(c.user_message, message);
      assert_eq!(c.fallback, Fallback::KeepState);
    }
  }

  #[test]
  fn anyhow_wrapped_storage_error_still_classifies_as_storage() {
    let wrapped: CartError = anyhow::Error::new(StorageError::AccessDenied { key: "k".into() }).into();
    assert_eq!(classify(&wrapped, Operation::Load).category, ErrorCategory::StorageAccessDenied);
  }
}
