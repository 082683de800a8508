// coursecart/src/pipeline/definition.rs

//! Contains the `Pipeline<TData>` struct definition and methods for its
//! construction and structural modification.

use crate::core::control::StepControl;
use crate::core::shared_state::SharedState;
use crate::core::step::StepDef;
use crate::error::CartResult;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A step handler: an async function over the shared pipeline context.
///
/// Handlers receive a clone of the `SharedState<TData>` handle. Lock guards
/// taken on it must be dropped before the handler awaits.
pub type StepHandler<TData> = Box<
  dyn Fn(SharedState<TData>) -> Pin<Box<dyn Future<Output = CartResult<StepControl>> + Send>> + Send + Sync,
>;

/// An ordered sequence of named steps, each with zero or more handlers.
pub struct Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Used as the span name for runs of this pipeline.
  pub(crate) name: &'static str,
  /// Ordered list of step definitions for this pipeline.
  pub(crate) steps: Vec<StepDef>,
  pub(crate) handlers: HashMap<String, Vec<StepHandler<TData>>>,
}

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Creates a pipeline from `(step name, optional)` pairs.
  pub fn new(name: &'static str, step_defs: &[(&str, bool)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional)| StepDef::new(*step_name, *optional))
      .collect();

    Self {
      name,
      steps,
      handlers: HashMap::new(),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  /// Appends a step. Returns `false` and leaves the pipeline unchanged when a
  /// step of that name already exists.
  pub fn push_step(&mut self, step_name: &str, optional: bool) -> bool {
    if self.has_step(step_name) {
      return false;
    }
    self.steps.push(StepDef::new(step_name, optional));
    true
  }
}
