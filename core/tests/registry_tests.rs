// tests/registry_tests.rs
mod common;

use common::*;
use hopz::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CancelCtx {
  val: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RefundCtx {
  num: i32,
}

#[tokio::test]
#[serial]
async fn test_registry_runs_pipeline_for_context_type() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut cancel = Pipeline::<CancelCtx, TestError>::new("cancel", &[("cancel", false)]);
  cancel
    .on("cancel", |ctx: ContextData<CancelCtx>| async move {
      ctx.write().val = "cancelled".to_string();
      Ok::<_, TestError>(PipelineControl::Continue)
    })
    .unwrap();
  flows.register(cancel);

  let mut refund = Pipeline::<RefundCtx, TestError>::new("refund", &[("refund", false)]);
  refund
    .on("refund", |ctx: ContextData<RefundCtx>| async move {
      ctx.write().num = 100;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
    .unwrap();
  flows.register(refund);

  assert_eq!(flows.len(), 2);
  assert!(flows.is_registered::<CancelCtx>());

  let cancel_ctx = ContextData::new(CancelCtx::default());
  assert_eq!(flows.run(cancel_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(cancel_ctx.read().val, "cancelled");

  let refund_ctx = ContextData::new(RefundCtx::default());
  assert_eq!(flows.run(refund_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(refund_ctx.read().num, 100);
}

#[tokio::test]
#[serial]
async fn test_registry_reports_unregistered_context() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  #[derive(Clone, Debug, Default)]
  struct UnregisteredContext;

  let result = flows.run(ContextData::new(UnregisteredContext)).await;
  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_registry_surfaces_pipeline_errors() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut p = Pipeline::<CancelCtx, TestError>::new("cancel", &[("fail", false)]);
  p.on("fail", |_ctx: ContextData<CancelCtx>| async move {
    Err::<PipelineControl, _>(TestError::Handler("cancel failed".to_string()))
  })
  .unwrap();
  flows.register(p);

  let result = flows.run(ContextData::new(CancelCtx::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("cancel failed".to_string()));
}

#[tokio::test]
#[serial]
async fn test_registry_with_flow_error_default() {
  setup_tracing();
  let flows: Flows = Flows::new();

  #[derive(Clone, Debug, Default)]
  struct SimpleCtx {
    count: i32,
  }

  let mut pipeline = Pipeline::<SimpleCtx, FlowError>::new("simple", &[("task", false)]);
  pipeline
    .on("task", |ctx: ContextData<SimpleCtx>| async move {
      ctx.write().count = 1;
      Ok::<_, anyhow::Error>(PipelineControl::Continue)
    })
    .unwrap();
  flows.register(pipeline);

  let ctx = ContextData::new(SimpleCtx::default());
  flows.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().count, 1);
}
