pub mod control;
pub mod item_id;
pub mod line_item;
pub mod raw_item;
pub mod shared_state;
pub mod step;

// Re-export key types for easier access from other modules (and lib.rs)
pub use control::{RunOutcome, StepControl};
pub use item_id::ItemId;
pub use line_item::{ItemKind, LineItem};
pub use raw_item::{PriceInput, RawItem};
pub use shared_state::SharedState;
pub use step::StepDef;
