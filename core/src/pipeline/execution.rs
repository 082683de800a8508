// coursecart/src/pipeline/execution.rs

//! Contains `Pipeline::run()`, which executes the steps and their handlers in order.

use crate::core::control::{RunOutcome, StepControl};
use crate::core::shared_state::SharedState;
use crate::error::{CartError, CartResult};
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Executes the pipeline against `ctx`.
  ///
  /// A required step with no handlers fails the run with `CartError::Internal`.
  /// The first handler error aborts the run and is returned as-is.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            pipeline = self.name,
            context_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx: SharedState<TData>) -> CartResult<RunOutcome> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name_str = step_def.name.as_str();

      let step_span = span!(
        Level::INFO,
        "pipeline_step_execution",
        step_name = step_name_str,
        step_index = step_idx,
        optional = step_def.optional
      );

      // Span guards are !Send; keep them out of the await points below.
      let handlers = {
        let _step_span_guard = step_span.enter();
        match self.handlers.get(step_name_str) {
          Some(handlers) if !handlers.is_empty() => handlers,
          _ if step_def.optional => {
            event!(Level::DEBUG, "Optional step has no handlers, skipping.");
            continue;
          }
          _ => {
            event!(Level::ERROR, "Required step has no handlers.");
            return Err(CartError::Internal(format!(
              "pipeline '{}' has no handler for required step '{}'",
              self.name, step_name_str
            )));
          }
        }
      };

      for (handler_idx, handler_fn) in handlers.iter().enumerate() {
        let handler_span = span!(parent: &step_span, Level::DEBUG, "step_handler", handler_index = handler_idx);
        match handler_fn(ctx.clone()).instrument(handler_span).await {
          Ok(StepControl::Continue) => {}
          Ok(StepControl::Stop) => {
            step_span.in_scope(|| event!(Level::INFO, "Pipeline stopped by a handler."));
            return Ok(RunOutcome::Stopped);
          }
          Err(e) => {
            step_span.in_scope(|| event!(Level::ERROR, error = %e, "Step handler failed."));
            return Err(e);
          }
        }
      }
      step_span.in_scope(|| event!(Level::DEBUG, "Step processing finished successfully."));
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(RunOutcome::Completed)
  }
}
