// coursecart/src/storage/mod.rs

//! Key/value storage for the cart: the `KeyValueStore` seam, two stores, the
//! fixed key catalogue and the persistence adapter the engine talks to.

pub mod adapter;
pub mod file;
pub mod keys;
pub mod memory;
pub mod store;

pub use adapter::CartStorage;
pub use file::FileStore;
pub use keys::{KeyCatalogue, RecordShape, StoredLocation};
pub use memory::{FailureMode, MemoryStore};
pub use store::{KeyValueStore, StorageArea, StorageKey};
