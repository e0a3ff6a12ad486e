// hopz/src/flow/pipeline.rs

//! `Pipeline<T, E>`: an ordered list of named steps, each with `before`, `on`
//! and `after` handlers that operate on a shared [`ContextData<T>`].

use crate::error::FlowError;
use crate::flow::context::ContextData;
use crate::flow::control::{PipelineControl, PipelineResult};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{event, instrument, span, Instrument, Level};

/// A boxed asynchronous step handler.
///
/// Handlers must release any lock taken on the context before awaiting.
pub type Handler<T, E> =
  Box<dyn Fn(ContextData<T>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, E>> + Send>> + Send + Sync>;

pub type SkipCondition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_condition", &self.skip_if.is_some())
      .finish()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

pub struct Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  name: &'static str,
  steps: Vec<StepDef<T>>,
  handlers: HashMap<(String, Phase), Vec<Handler<T, E>>>,
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional)` pairs, in execution order.
  pub fn new(name: &'static str, step_defs: &[(&str, bool)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: None,
      })
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

  fn position(&self, step_name: &str) -> Result<usize, FlowError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  pub fn insert_after(&mut self, existing: &str, new_step: &str, optional: bool) -> Result<(), FlowError> {
    let idx = self.position(existing)?;
    if self.position(new_step).is_ok() {
      return Err(FlowError::DuplicateStep {
        step_name: new_step.to_string(),
      });
    }
    self.steps.insert(
      idx + 1,
      StepDef {
        name: new_step.to_string(),
        optional,
        skip_if: None,
      },
    );
    Ok(())
  }

  /// Removes a step and every handler registered for it. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    self.steps.retain(|s| s.name != step_name);
    self.handlers.retain(|(name, _), _| name != step_name);
  }

  pub fn skip_if(
    &mut self,
    step_name: &str,
    condition: impl Fn(&T) -> bool + Send + Sync + 'static,
  ) -> Result<(), FlowError> {
    let idx = self.position(step_name)?;
    self.steps[idx].skip_if = Some(Arc::new(condition));
    Ok(())
  }

  fn push_handler<F, HandlerErr>(
    &mut self,
    step_name: &str,
    phase: Phase,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> Result<(), FlowError>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.position(step_name)?;
    let boxed: Handler<T, E> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self
      .handlers
      .entry((step_name.to_string(), phase))
      .or_default()
      .push(boxed);
    Ok(())
  }

  pub fn before<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> Result<(), FlowError>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.push_handler(step_name, Phase::Before, handler_fn)
  }

  pub fn on<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> Result<(), FlowError>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.push_handler(step_name, Phase::On, handler_fn)
  }

  pub fn after<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> Result<(), FlowError>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.push_handler(step_name, Phase::After, handler_fn)
  }

  fn handlers_for(&self, step_name: &str, phase: Phase) -> &[Handler<T, E>] {
    self
      .handlers
      .get(&(step_name.to_string(), phase))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  async fn run_step(&self, step_def: &StepDef<T>, ctx_data: &ContextData<T>) -> Result<Option<PipelineResult>, E> {
    let step_name = step_def.name.as_str();

    if let Some(skip) = &step_def.skip_if {
      if ctx_data.with(|data| skip(data)) {
        event!(Level::INFO, "Step skipped by condition.");
        return Ok(None);
      }
    }

    let phases = [Phase::Before, Phase::On, Phase::After];
    let has_any = phases.iter().any(|p| !self.handlers_for(step_name, *p).is_empty());
    if !has_any {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(None);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(E::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for phase in phases {
      for handler_fn in self.handlers_for(step_name, phase) {
        match handler_fn(ctx_data.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::INFO, phase = phase.label(), "Pipeline stopped by handler.");
            return Ok(Some(PipelineResult::Stopped));
          }
          Err(e) => {
            event!(Level::WARN, phase = phase.label(), error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
    }
    Ok(None)
  }

  /// Runs every step in order against `ctx_data`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<T>) -> Result<PipelineResult, E> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step_execution",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );
      if let Some(early) = self.run_step(step_def, &ctx_data).instrument(step_span).await? {
        return Ok(early);
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}
