// src/lib.rs

//! Coursecart: an ASYNC cart state engine for course and book purchases.
//!
//! The engine owns one canonical cart and keeps it consistent across:
//!  - Free-form item records from many page types, normalized into one shape.
//!  - Prices written as numbers or as text with currency markers.
//!  - Deprecated storage locations, drained into the canonical key once.
//!  - Corrupt or hand-edited stored data, validated on the way in.
//!  - Storage that is full, disabled or failing, by degrading to memory-only.
//!  - Explicit recovery from whatever cart data survives.

pub mod classify;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod migrate;
pub mod normalize;
pub mod pipeline;
pub mod pricing;
pub mod recovery;
pub mod storage;
pub mod validate;

// --- Re-exports for the Public API ---

// Value types that hosts build and read
pub use crate::core::{ItemId, ItemKind, LineItem, PriceInput, RawItem};
pub use crate::core::{RunOutcome, SharedState, StepControl, StepDef};

// The engine and what it emits
pub use crate::engine::{CartEngine, CartEvent, CartPhase, CartSnapshot, DebugReport, Severity, Toast};

pub use crate::classify::{classify, Classification, ErrorCategory, Fallback, Operation};
pub use crate::config::CartConfig;
pub use crate::error::{CartError, CartResult, ConflictKind, StorageError};

pub use crate::normalize::{normalize, Normalizer};
pub use crate::pricing::{format_price, parse_price};
pub use crate::validate::{validate, InvalidReason, Validated};

pub use crate::pipeline::Pipeline;

pub use crate::storage::{
  CartStorage, FailureMode, FileStore, KeyCatalogue, KeyValueStore, MemoryStore, RecordShape, StorageArea, StorageKey,
  StoredLocation,
};

/*
    Typical host wiring:
    1. Load a `CartConfig` (`CartConfig::from_env()` or `CartConfig::default()`).
    2. Pick a `KeyValueStore` (`FileStore::open(dir)`, `MemoryStore::new()`, or your own).
    3. `CartEngine::start(Arc::new(store), config).await` runs probe, migration, load and validation.
    4. `engine.subscribe()` and re-render on `CartEvent::StateChanged`, show `CartEvent::Toast`s.
    5. Call `add_item`, `remove_item`, `update_quantity`, `clear`, `enroll_now`, `recover`,
       `begin_checkout` from UI events; read `items()`, `count()`, `total()` for display.
*/
