// hopz-server/src/flows/order_status_flow.rs

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps;
use crate::flows::contexts::OrderStatusCtxData;
use crate::models::Order;
use crate::services::{audit, notification_service};
use chrono::Utc;
use hopz::lifecycle::order::{plan_transition, Transition};
use hopz::notify::Draft;
use hopz::{ContextData, FlowError, Flows, OrderStatus, Pipeline, PipelineControl};
use sqlx::types::Json;
use tracing::{event, info, Level};

/// Registers admin status changes. An unchanged status stops the flow before
/// anything is written.
pub fn register_order_status_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<OrderStatusCtxData, AppError>::new(
    "order_status",
    &[
      ("parse_target_status", false),
      ("load_order", false),
      ("plan_transition", false),
      ("persist_status", false),
      ("notify_customer", true),
    ],
  );

  p.on("parse_target_status", parse_target_status)?;
  p.on("load_order", load_order)?;
  p.on("plan_transition", plan_status_transition)?;
  p.on("persist_status", persist_status)?;
  p.on("notify_customer", notify_customer)?;

  flows.register(p);
  info!("Order-status flow registered.");
  Ok(())
}

async fn parse_target_status(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let raw = ctx_data.with(|c| c.input.status.clone());
  let target: OrderStatus = raw.trim().to_uppercase().parse()?;
  ctx_data.write().target = Some(target);
  Ok(PipelineControl::Continue)
}

async fn load_order(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (order_ref, pool) = ctx_data.with(|c| (c.order_ref.clone(), c.app_state.db_pool.clone()));
  let order = common_steps::find_order(&pool, &order_ref)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Stops the flow when the order is already in the requested status.
async fn plan_status_transition(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (from, to) = ctx_data.with(|c| (c.order.as_ref().map(|o| o.status), c.target));
  let (from, to) = from
    .zip(to)
    .ok_or_else(|| AppError::Internal("Order status flow state incomplete".to_string()))?;

  let transition = plan_transition(from, to)?;
  let unchanged = transition == Transition::Unchanged;
  ctx_data.write().transition = Some(transition);
  if unchanged {
    event!(Level::INFO, status = %from, "Status unchanged; nothing to write.");
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

async fn persist_status(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (order, target, input, actor, pool) = ctx_data.with(|c| {
    (
      c.order.clone(),
      c.target,
      c.input.clone(),
      c.actor.clone(),
      c.app_state.db_pool.clone(),
    )
  });
  let order = order.ok_or_else(|| AppError::Internal("Order not loaded".to_string()))?;
  let target = target.ok_or_else(|| AppError::Internal("Target status not parsed".to_string()))?;

  let mut tx = pool.begin().await?;
  let order = common_steps::lock_order(&mut tx, order.id).await?;
  if plan_transition(order.status, target)? == Transition::Unchanged {
    tx.rollback().await?;
    event!(Level::INFO, status = %order.status, "Status reached concurrently; nothing to write.");
    ctx_data.write().updated = Some(order);
    return Ok(PipelineControl::Continue);
  }

  let now = Utc::now();
  let mut history = order.status_history.0.clone();
  let notes = input.notes.clone().filter(|n| !n.trim().is_empty());
  history.record(target, actor.history_label(), notes, now);
  let delivered_at = match target {
    OrderStatus::Delivered => Some(now),
    _ => order.delivered_at,
  };

  let updated = sqlx::query_as::<_, Order>(
    "UPDATE orders SET status = $2, status_history = $3,
       tracking_number = COALESCE($4, tracking_number),
       courier_partner = COALESCE($5, courier_partner),
       estimated_delivery = COALESCE($6, estimated_delivery),
       delivered_at = $7,
       updated_at = NOW()
     WHERE id = $1 RETURNING *",
  )
  .bind(order.id)
  .bind(target)
  .bind(Json(&history))
  .bind(input.tracking_number.as_deref().map(str::trim).filter(|t| !t.is_empty()))
  .bind(input.courier_partner.as_deref().map(str::trim).filter(|t| !t.is_empty()))
  .bind(input.estimated_delivery)
  .bind(delivered_at)
  .fetch_one(&mut *tx)
  .await?;

  if target == OrderStatus::Cancelled {
    let items = common_steps::load_order_items(&mut *tx, order.id).await?;
    common_steps::restock_order_items(&mut tx, &items).await?;
  }
  audit::record(
    &mut *tx,
    audit::AuditEntry {
      admin_id: actor.user_id,
      action: "UPDATE_ORDER_STATUS",
      entity: "Order",
      entity_id: Some(order.id.to_string()),
      details: format!("{} -> {}", order.status, target),
    },
  )
  .await?;
  tx.commit().await?;

  info!(order_id = %updated.id, from = %order.status, to = %target, "Order status changed.");
  ctx_data.write().updated = Some(updated);
  Ok(PipelineControl::Continue)
}

async fn notify_customer(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (state, order) = ctx_data.with(|c| (c.app_state.clone(), c.updated.clone()));
  if let Some((user_id, order)) = order.and_then(|o| o.user_id.map(|u| (u, o))) {
    notification_service::dispatch(
      &state.db_pool,
      &state.config,
      Draft::order_status(user_id, &order.order_number, order.status),
    )
    .await;
  }
  Ok(PipelineControl::Continue)
}
