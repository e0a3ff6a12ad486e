// hopz-server/src/flows/create_return_flow.rs

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps;
use crate::flows::contexts::CreateReturnCtxData;
use crate::models::{ReturnRequest, User};
use crate::services::notification_service;
use chrono::Utc;
use hopz::lifecycle::returns::{select_lines, OrderLine, RefundStatus, ReturnEligibility};
use hopz::notify::Draft;
use hopz::pricing::{items_total, RefundQuote};
use hopz::{ContextData, FlowError, Flows, Pipeline, PipelineControl, ReturnStatus, ReturnType, RuleViolation};
use sqlx::types::Json;
use tracing::{info, warn};

/// Registers customer return and exchange requests.
pub fn register_create_return_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<CreateReturnCtxData, AppError>::new(
    "create_return",
    &[
      ("parse_request", false),
      ("load_order", false),
      ("check_eligibility", false),
      ("select_lines", false),
      ("persist_request", false),
      ("notify_admins", true),
    ],
  );

  p.on("parse_request", parse_request)?;
  p.on("load_order", load_order)?;
  p.on("check_eligibility", check_eligibility)?;
  p.on("select_lines", select_return_lines)?;
  p.on("persist_request", persist_request)?;
  p.on("notify_admins", notify_admins)?;

  flows.register(p);
  info!("Create-return flow registered.");
  Ok(())
}

async fn parse_request(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (raw_type, has_items) = ctx_data.with(|c| (c.input.return_type.clone(), !c.input.items.is_empty()));
  let return_type = ReturnType::parse(&raw_type)?;
  if !has_items {
    return Err(RuleViolation::NoItemsSelected.into());
  }
  ctx_data.write().return_type = Some(return_type);
  Ok(PipelineControl::Continue)
}

async fn load_order(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (order_ref, actor, pool) = ctx_data.with(|c| (c.input.order_id.clone(), c.actor.clone(), c.app_state.db_pool.clone()));

  let order = common_steps::find_order(&pool, &order_ref)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  if order.user_id != Some(actor.user_id) {
    return Err(AppError::Forbidden("Not authorized to return this order".to_string()));
  }
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn check_eligibility(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (order, pool, window_days) = ctx_data.with(|c| {
    (
      c.order.clone(),
      c.app_state.db_pool.clone(),
      c.app_state.config.return_window_days,
    )
  });
  let order = order.ok_or_else(|| AppError::Internal("Order not loaded".to_string()))?;

  let has_open: bool = sqlx::query_scalar(
    "SELECT EXISTS(SELECT 1 FROM return_requests WHERE order_id = $1 AND status IN ('PENDING', 'APPROVED'))",
  )
  .bind(order.id)
  .fetch_one(&pool)
  .await?;

  ReturnEligibility::check(order.status, order.delivered_at, Utc::now(), window_days, has_open)?;
  Ok(PipelineControl::Continue)
}

async fn select_return_lines(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (order_id, requested, return_type, pool) = ctx_data.with(|c| {
    (
      c.order.as_ref().map(|o| o.id),
      c.input.items.clone(),
      c.return_type,
      c.app_state.db_pool.clone(),
    )
  });
  let (order_id, return_type) = order_id
    .zip(return_type)
    .ok_or_else(|| AppError::Internal("Return flow state incomplete".to_string()))?;

  let order_lines: Vec<OrderLine> = common_steps::load_order_items(&pool, order_id)
    .await?
    .iter()
    .map(OrderLine::from)
    .collect();
  let lines = select_lines(&order_lines, &requested)?;
  let quote = RefundQuote::for_request(return_type, items_total(&lines));

  {
    let mut guard = ctx_data.write();
    guard.lines = lines;
    guard.quote = Some(quote);
  }
  Ok(PipelineControl::Continue)
}

async fn persist_request(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (order, actor, input, return_type, lines, quote, pool) = ctx_data.with(|c| {
    (
      c.order.clone(),
      c.actor.clone(),
      c.input.clone(),
      c.return_type,
      c.lines.clone(),
      c.quote,
      c.app_state.db_pool.clone(),
    )
  });
  let order = order.ok_or_else(|| AppError::Internal("Order not loaded".to_string()))?;
  let return_type = return_type.ok_or_else(|| AppError::Internal("Return type not parsed".to_string()))?;
  let quote = quote.ok_or_else(|| AppError::Internal("Refund not quoted".to_string()))?;

  let pickup_address = match input.pickup_address {
    Some(address) => {
      address.validate().map_err(AppError::Validation)?;
      address
    }
    None => order.address.0.clone(),
  };
  let refund_status = quote.refund_amount.map(|_| RefundStatus::Pending);
  let comments = input.comments.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

  let created = sqlx::query_as::<_, ReturnRequest>(
    "INSERT INTO return_requests (order_id, user_id, return_type, status, items, items_total, pickup_charge,
       refund_amount, refund_status, comments, pickup_address)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
     RETURNING *",
  )
  .bind(order.id)
  .bind(actor.user_id)
  .bind(return_type)
  .bind(ReturnStatus::Pending)
  .bind(Json(&lines))
  .bind(quote.items_total)
  .bind(quote.pickup_charge)
  .bind(quote.refund_amount)
  .bind(refund_status)
  .bind(comments)
  .bind(Json(&pickup_address))
  .fetch_one(&pool)
  .await
  .map_err(open_request_conflict)?;

  info!(return_id = %created.id, order_id = %order.id, kind = ?return_type, "Return request filed.");
  ctx_data.write().created = Some(created);
  Ok(PipelineControl::Continue)
}

/// `return_requests_one_open_per_order` backs the eligibility check when two
/// requests for the same order race past it.
fn open_request_conflict(err: sqlx::Error) -> AppError {
  match &err {
    sqlx::Error::Database(db) if db.is_unique_violation() => RuleViolation::OpenReturnExists.into(),
    _ => AppError::Sqlx(err),
  }
}

async fn notify_admins(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (state, order, actor, return_type) =
    ctx_data.with(|c| (c.app_state.clone(), c.order.clone(), c.actor.clone(), c.return_type));
  let (Some(order), Some(return_type)) = (order, return_type) else {
    return Ok(PipelineControl::Continue);
  };

  let customer = match sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
    .bind(actor.user_id)
    .fetch_optional(&state.db_pool)
    .await
  {
    Ok(Some(user)) => user.display_name(),
    Ok(None) => actor.email.clone(),
    Err(e) => {
      warn!(error = %e, "Could not load customer for return notification.");
      actor.email.clone()
    }
  };
  notification_service::dispatch(
    &state.db_pool,
    &state.config,
    Draft::return_requested(&order.order_number, return_type, &customer),
  )
  .await;
  Ok(PipelineControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn non_constraint_errors_pass_through() {
    assert!(matches!(open_request_conflict(sqlx::Error::RowNotFound), AppError::Sqlx(_)));
  }
}
