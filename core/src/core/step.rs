// coursecart/src/core/step.rs

//! Defines the structure for a single step within a pipeline.

/// A named pipeline step. An optional step without handlers is skipped; a
/// required one without handlers fails the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
  pub name: String,
  pub optional: bool,
}

impl StepDef {
  pub fn new(name: impl Into<String>, optional: bool) -> Self {
    Self {
      name: name.into(),
      optional,
    }
  }
}
