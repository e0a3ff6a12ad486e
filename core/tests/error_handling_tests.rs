// tests/error_handling_tests.rs
mod common;
use common::*;
use hopz::{ContextData, FlowError, Pipeline, PipelineControl, RuleViolation};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new("flow_err", &[("task", false)]);
  pipeline
    .on("task", |ctx: ContextData<TestContext>| async move {
      ctx.write().counter = 1;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
    .unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing = Pipeline::<TestContext, FlowError>::new("flow_err_fail", &[("fail_task", false)]);
  failing
    .on("fail_task", |_ctx: ContextData<TestContext>| async move {
      Err::<PipelineControl, _>(FlowError::Internal("Intentional".to_string()))
    })
    .unwrap();
  match failing.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "Intentional"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_anyhow_errors_become_handler_errors() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new("anyhow", &[("task", false)]);
  pipeline
    .on("task", |_ctx: ContextData<TestContext>| async move {
      Err::<PipelineControl, _>(anyhow::anyhow!("disk on fire"))
    })
    .unwrap();

  let err = pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert!(matches!(err, FlowError::HandlerError { .. }));
  assert!(err.to_string().contains("disk on fire"));
}

#[test]
fn test_rule_violation_messages_read_naturally() {
  use hopz::{ReturnAction, ReturnStatus};
  let err = ReturnStatus::Approved.apply(ReturnAction::Approve).unwrap_err();
  assert_eq!(err.to_string(), "Only pending requests can be approved");

  let err = ReturnStatus::Pending.apply(ReturnAction::Complete).unwrap_err();
  assert_eq!(err.to_string(), "Only approved requests can be completed");

  assert!(RuleViolation::OpenReturnExists.is_conflict());
  assert!(RuleViolation::CouponInactive.is_not_found());
  assert!(!RuleViolation::CouponExpired.is_not_found());
}
