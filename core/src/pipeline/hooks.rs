// coursecart/src/pipeline/hooks.rs

//! Handler registration for pipeline steps.

use crate::core::control::StepControl;
use crate::core::shared_state::SharedState;
use crate::error::CartError;
use crate::pipeline::definition::{Pipeline, StepHandler};
use std::future::Future;
use tracing::{event, Level};

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Registers a handler for `step_name`. A step not yet declared is appended
  /// as a required step.
  ///
  /// The handler's error type only has to convert into `CartError`.
  pub fn on_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(SharedState<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<CartError> + Send + Sync + 'static,
  {
    if self.push_step(step_name, false) {
      event!(Level::DEBUG, pipeline = self.name, %step_name, "Step declared implicitly by handler registration.");
    }
    let final_handler: StepHandler<TData> = Box::new(move |ctx| {
      let user_fut = handler_fn(ctx);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    });
    self
      .handlers
      .entry(step_name.to_string())
      .or_default()
      .push(final_handler);
  }
}
