// hopz-server/src/flows/cancel_order_flow.rs

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps;
use crate::flows::contexts::CancelOrderCtxData;
use crate::models::Order;
use crate::services::{notification_service, payment_gateway};
use chrono::Utc;
use hopz::lifecycle::order::{ensure_customer_cancellable, payment_status_after_cancel};
use hopz::notify::Draft;
use hopz::{ContextData, FlowError, Flows, OrderStatus, PaymentStatus, Pipeline, PipelineControl};
use sqlx::types::Json;
use tracing::{info, warn};

pub const DEFAULT_CANCEL_REASON: &str = "Cancelled by user";

/// Registers customer cancellation. Stock comes back and a paid online order
/// is marked refunded in the same transaction; the gateway refund call that
/// follows is optional and only logged when it fails.
pub fn register_cancel_order_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(
    "cancel_order",
    &[
      ("load_order", false),
      ("check_cancellable", false),
      ("persist_cancellation", false),
      ("request_refund", true),
      ("notify_cancellation", true),
    ],
  );

  p.skip_if("request_refund", |c| {
    c.updated.as_ref().map(|o| o.payment_status) != Some(PaymentStatus::Refunded)
  })?;

  p.on("load_order", load_order)?;
  p.on("check_cancellable", check_cancellable)?;
  p.on("persist_cancellation", persist_cancellation)?;
  p.on("request_refund", request_refund)?;
  p.on("notify_cancellation", notify_cancellation)?;

  flows.register(p);
  info!("Cancel-order flow registered.");
  Ok(())
}

async fn load_order(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (order_ref, actor, pool) = ctx_data.with(|c| (c.order_ref.clone(), c.actor.clone(), c.app_state.db_pool.clone()));

  let order = common_steps::find_order(&pool, &order_ref)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  common_steps::ensure_order_access(&order, actor.user_id, actor.is_admin)?;
  let items = common_steps::load_order_items(&pool, order.id).await?;

  {
    let mut guard = ctx_data.write();
    guard.order = Some(order);
    guard.items = items;
  }
  Ok(PipelineControl::Continue)
}

async fn check_cancellable(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let status = ctx_data.with(|c| c.order.as_ref().map(|o| o.status));
  let status = status.ok_or_else(|| AppError::Internal("Order not loaded".to_string()))?;
  ensure_customer_cancellable(status)?;
  Ok(PipelineControl::Continue)
}

async fn persist_cancellation(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (order, items, actor, reason, pool) = ctx_data.with(|c| {
    (
      c.order.clone(),
      c.items.clone(),
      c.actor.clone(),
      c.reason.clone(),
      c.app_state.db_pool.clone(),
    )
  });
  let order = order.ok_or_else(|| AppError::Internal("Order not loaded".to_string()))?;

  let mut tx = pool.begin().await?;
  // A concurrent cancel or status change may have landed since load_order.
  let order = common_steps::lock_order(&mut tx, order.id).await?;
  ensure_customer_cancellable(order.status)?;

  let payment_status = payment_status_after_cancel(order.payment_method, order.payment_status);
  let mut history = order.status_history.0.clone();
  history.record(OrderStatus::Cancelled, actor.history_label(), Some(reason.clone()), Utc::now());

  let updated = sqlx::query_as::<_, Order>(
    "UPDATE orders SET status = $2, payment_status = $3, cancellation_reason = $4, status_history = $5, updated_at = NOW()
     WHERE id = $1 RETURNING *",
  )
  .bind(order.id)
  .bind(OrderStatus::Cancelled)
  .bind(payment_status)
  .bind(&reason)
  .bind(Json(&history))
  .fetch_one(&mut *tx)
  .await?;
  common_steps::restock_order_items(&mut tx, &items).await?;
  tx.commit().await?;

  info!(order_id = %updated.id, by = %actor.user_id, "Order cancelled.");
  ctx_data.write().updated = Some(updated);
  Ok(PipelineControl::Continue)
}

async fn request_refund(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let order = ctx_data.with(|c| c.updated.clone());
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  let transaction_id = order.transaction_id.clone().unwrap_or_else(|| order.order_number.clone());

  match payment_gateway::request_refund(&transaction_id, order.total).await {
    Ok(refund_id) => ctx_data.write().refund_id = Some(refund_id),
    Err(e) => warn!(error = %e, order_id = %order.id, "Gateway refund request failed; settle manually."),
  }
  Ok(PipelineControl::Continue)
}

async fn notify_cancellation(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (state, order, reason) = ctx_data.with(|c| (c.app_state.clone(), c.updated.clone(), c.reason.clone()));
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };

  notification_service::dispatch(
    &state.db_pool,
    &state.config,
    Draft::order_cancelled(&order.order_number, &reason),
  )
  .await;
  if let Some(user_id) = order.user_id {
    notification_service::dispatch(
      &state.db_pool,
      &state.config,
      Draft::order_status(user_id, &order.order_number, OrderStatus::Cancelled),
    )
    .await;
  }
  Ok(PipelineControl::Continue)
}
