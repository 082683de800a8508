// coursecart/src/core/control.rs

//! Signals for controlling a pipeline run and the outcome of one.

/// Returned by a step handler to say whether the pipeline should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  /// Run the remaining handlers and steps.
  Continue,
  /// Halt the pipeline. No further handlers in this step or later steps run.
  Stop,
}

/// Outcome of a full pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  /// Every non-skipped step ran to completion.
  Completed,
  /// A handler returned `StepControl::Stop`.
  Stopped,
}
