// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use hopz::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("ordered", &[("step1", false), ("step2", false), ("step3", false)]);

  pipeline.on("step1", create_simple_handler("step1", " S1")).unwrap();
  pipeline.on("step2", create_simple_handler("step2", " S2")).unwrap();
  pipeline.on("step3", create_simple_handler("step3", " S3")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("stopping", &[("stepA", false), ("stopStep", false), ("stepC", false)]);

  pipeline.on("stepA", create_simple_handler("stepA", "A")).unwrap();
  pipeline
    .on("stopStep", |ctx: ContextData<TestContext>| async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<_, TestError>(PipelineControl::Stop)
    })
    .unwrap();
  pipeline.on("stepC", create_simple_handler("stepC", "C")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new("failing", &[("good_step", false), ("bad_step", false), ("another_step", false)]);

  pipeline.on("good_step", create_simple_handler("good_step", "Good")).unwrap();
  pipeline.on("bad_step", create_failing_handler("bad_step", "I am a bad step!")).unwrap();
  pipeline.on("another_step", create_simple_handler("another_step", "NeverRun")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_rule_violation_converts_into_pipeline_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("rules", &[("check", false)]);
  pipeline
    .on("check", |_ctx: ContextData<TestContext>| async move {
      hopz::lifecycle::order::ensure_customer_cancellable(hopz::OrderStatus::Shipped)?;
      Ok::<_, hopz::RuleViolation>(PipelineControl::Continue)
    })
    .unwrap();

  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  assert!(matches!(
    result,
    Err(TestError::Rule(hopz::RuleViolation::NotCancellable { status: hopz::OrderStatus::Shipped }))
  ));
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_if_condition_met() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new("skipping", &[("step1", false), ("step_to_skip", false), ("step3", false)]);

  pipeline.on("step1", create_simple_handler("step1", " S1")).unwrap();
  pipeline.on("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED")).unwrap();
  pipeline.on("step3", create_simple_handler("step3", " S3")).unwrap();
  pipeline.skip_if("step_to_skip", |data: &TestContext| data.counter > 0).unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);

  let guard = ctx.read();
  assert_eq!(guard.message, " S1 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_non_optional_step_missing_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new("missing", &[("step_with_no_handler", false)]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("step_with_no_handler"));
    }
    other => panic!("Expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_optional_step_missing_handler_succeeds() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new("optional", &[("optional_step_no_handler", true)]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  assert_eq!(result.unwrap(), PipelineResult::Completed);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_execution_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("phases", &[("main_step", false)]);

  pipeline.after("main_step", create_simple_handler("after_main", "After;")).unwrap();
  pipeline.on("main_step", create_simple_handler("on_main", "On;")).unwrap();
  pipeline.before("main_step", create_simple_handler("before_main", "Before;")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.message, "Before;On;After;");
  assert_eq!(guard.steps_executed, vec!["before_main", "on_main", "after_main"]);
}

#[tokio::test]
#[serial]
async fn test_registering_on_unknown_step_is_rejected() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("unknown", &[("known", false)]);

  let err = pipeline.on("unknwon", create_simple_handler("unknwon", "x")).unwrap_err();
  assert!(matches!(err, FlowError::StepNotFound { ref step_name } if step_name == "unknwon"));
  assert!(pipeline.skip_if("nope", |_: &TestContext| true).is_err());
}

#[tokio::test]
#[serial]
async fn test_insert_after_and_remove_step_reshape_the_run() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("mutable", &[("validate", false), ("persist", false)]);
  pipeline.insert_after("validate", "price", false).unwrap();
  assert_eq!(pipeline.step_names(), vec!["validate", "price", "persist"]);
  assert!(matches!(
    pipeline.insert_after("validate", "persist", false),
    Err(FlowError::DuplicateStep { .. })
  ));

  pipeline.on("validate", create_simple_handler("validate", "V")).unwrap();
  pipeline.on("price", create_simple_handler("price", "P")).unwrap();
  pipeline.on("persist", create_simple_handler("persist", "S")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "VPS");

  pipeline.remove_step("price");
  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "VS");
  assert_eq!(pipeline.step_names(), vec!["validate", "persist"]);
}

#[tokio::test]
#[serial]
async fn test_context_changes_are_visible_to_later_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("handoff", &[("produce", false), ("consume", false)]);
  pipeline
    .on("produce", |ctx: ContextData<TestContext>| async move {
      ctx.update(|d| d.message = "priced".to_string());
      tokio::task::yield_now().await;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
    .unwrap();
  pipeline
    .on("consume", |ctx: ContextData<TestContext>| async move {
      let seen = ctx.with(|d| d.message.clone());
      if seen != "priced" {
        return Err(TestError::Handler(format!("saw {seen}")));
      }
      ctx.write().counter = 42;
      Ok(PipelineControl::Continue)
    })
    .unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.into_inner().counter, 42);
}
