// coursecart/src/engine/state.rs
use crate::core::line_item::LineItem;
use crate::engine::events::CartPhase;

/// The canonical collection plus the lifecycle phase. Owned by one engine.
#[derive(Debug, Clone)]
pub(crate) struct CartState {
  pub items: Vec<LineItem>,
  pub phase: CartPhase,
}

impl Default for CartState {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      phase: CartPhase::Uninitialized,
    }
  }
}
