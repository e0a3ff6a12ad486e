// hopz/src/flow/registry.rs

//! `Flows<E>`: a registry that keeps one pipeline per context type and runs
//! the matching pipeline for whatever context it is handed.

use crate::error::FlowError;
use crate::flow::context::ContextData;
use crate::flow::control::PipelineResult;
use crate::flow::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  fn pipeline_name(&self) -> &'static str;

  /// `ctx_obj` must hold a `ContextData<T>` for the wrapped pipeline's `T`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct RunnerWrapper<T, PipeErr, AppErr>
where
  T: 'static + Send + Sync,
  PipeErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<T, PipeErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, PipeErr, AppErr> ErasedRunner<AppErr> for RunnerWrapper<T, PipeErr, AppErr>
where
  T: 'static + Send + Sync,
  PipeErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<PipeErr> + From<FlowError> + Send + Sync + 'static,
{
  fn pipeline_name(&self) -> &'static str {
    self.pipeline.name()
  }

  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let typed = match ctx_obj.downcast::<ContextData<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<T>>();
        event!(Level::ERROR, expected_type, "Context object type mismatch.");
        return Err(AppErr::from(FlowError::TypeMismatch {
          expected_type: expected_type.to_string(),
        }));
      }
    };
    self.pipeline.run(typed).await.map_err(AppErr::from)
  }
}

/// Registry of business pipelines, keyed by context type.
pub struct Flows<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  registry: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Default for Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for its context type. A later registration for the
  /// same type replaces the earlier one.
  pub fn register<T, PipeErr>(&self, pipeline: Pipeline<T, PipeErr>)
  where
    T: 'static + Send + Sync,
    PipeErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<PipeErr>,
  {
    event!(
      Level::DEBUG,
      pipeline = pipeline.name(),
      ctx_type = %std::any::type_name::<T>(),
      "Registering pipeline."
    );
    let wrapper = RunnerWrapper::<T, PipeErr, AppErr> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    };
    self.registry.write().insert(TypeId::of::<T>(), Arc::new(wrapper));
  }

  pub fn is_registered<T: 'static>(&self) -> bool {
    self.registry.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.registry.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.registry.read().is_empty()
  }

  /// Runs the pipeline registered for `T`.
  #[instrument(name = "Flows::run", skip_all, fields(ctx_type = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, ctx_data: ContextData<T>) -> Result<PipelineResult, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = {
      let guard = self.registry.read();
      guard.get(&TypeId::of::<T>()).cloned()
    };
    let runner = runner.ok_or_else(|| {
      let context_type = std::any::type_name::<T>().to_string();
      event!(Level::ERROR, %context_type, "No pipeline registered.");
      AppErr::from(FlowError::NotRegistered { context_type })
    })?;

    event!(Level::DEBUG, pipeline = runner.pipeline_name(), "Dispatching.");
    runner.run_erased(Box::new(ctx_data)).await
  }
}
