// hopz-server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{clean, run_flow};
use crate::errors::{AppError, Result as AppResult};
use crate::flows::cancel_order_flow::DEFAULT_CANCEL_REASON;
use crate::flows::common_steps;
use crate::flows::contexts::{CancelOrderCtxData, OrderStatusCtxData, PlaceOrderCtxData, PlaceOrderInput, StatusUpdateInput};
use crate::models::order::OrderWithItems;
use crate::models::{Order, OrderItem};
use crate::services::audit::{self, AuditEntry};
use crate::services::notification_service;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser, OptionalUser, StaffUser};
use hopz::lifecycle::order::phones_match;
use hopz::notify::Draft;
use hopz::PipelineResult;

#[derive(Deserialize, Debug, Default)]
pub struct MyOrdersQuery {
  pub order_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TrackOrderPayload {
  pub order_id: String,
  pub phone: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct CancelOrderPayload {
  #[serde(default)]
  pub reason: Option<String>,
}

/// Loads the lines for `orders` in one query and pairs them up.
async fn with_items(app_state: &AppState, orders: Vec<Order>) -> AppResult<Vec<OrderWithItems>> {
  let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
  let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY name")
    .bind(&ids)
    .fetch_all(&app_state.db_pool)
    .await?;

  let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
  for item in items {
    by_order.entry(item.order_id).or_default().push(item);
  }
  Ok(
    orders
      .into_iter()
      .map(|order| {
        let items = by_order.remove(&order.id).unwrap_or_default();
        OrderWithItems { order, items }
      })
      .collect(),
  )
}

async fn order_with_items(app_state: &AppState, order: Order) -> AppResult<OrderWithItems> {
  let items = common_steps::load_order_items(&app_state.db_pool, order.id).await?;
  Ok(OrderWithItems { order, items })
}

#[instrument(name = "handler::create_order", skip_all, fields(user_id = ?user.0.as_ref().map(|u| u.user_id), lines = req_payload.items.len()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  req_payload: web::Json<PlaceOrderInput>,
) -> AppResult<HttpResponse> {
  let ctx = PlaceOrderCtxData::new(
    app_state.get_ref().clone(),
    user.0.as_ref().map(AuthenticatedUser::actor),
    req_payload.into_inner(),
  );

  let (_, ctx) = run_flow(&app_state, ctx).await?;
  let order = ctx
    .order
    .ok_or_else(|| AppError::Internal("Order flow completed without an order".to_string()))?;
  Ok(HttpResponse::Created().json(OrderWithItems { order, items: ctx.items }))
}

#[instrument(name = "handler::my_orders", skip(app_state, user))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  query: web::Query<MyOrdersQuery>,
) -> AppResult<HttpResponse> {
  match (&user.0, clean(query.into_inner().order_id)) {
    (Some(user), _) => {
      let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user.user_id)
        .fetch_all(&app_state.db_pool)
        .await?;
      Ok(HttpResponse::Ok().json(with_items(&app_state, orders).await?))
    }
    (None, Some(order_ref)) => {
      let order = common_steps::find_order(&app_state.db_pool, &order_ref)
        .await?
        .filter(|o| o.user_id.is_none())
        .ok_or_else(|| AppError::not_found("Order"))?;
      Ok(HttpResponse::Ok().json(vec![order_with_items(&app_state, order).await?]))
    }
    (None, None) => Err(AppError::Auth("No token provided".to_string())),
  }
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<String>,
) -> AppResult<HttpResponse> {
  let order = common_steps::find_order(&app_state.db_pool, &path.into_inner())
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  common_steps::ensure_order_access(&order, auth_user.user_id, auth_user.is_admin())?;
  Ok(HttpResponse::Ok().json(order_with_items(&app_state, order).await?))
}

/// Public tracking: the phone on the order must match on its last 10 digits.
#[instrument(name = "handler::track_order", skip_all, fields(order_ref = %req_payload.order_id))]
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<TrackOrderPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  if p.order_id.trim().is_empty() || p.phone.trim().is_empty() {
    return Err(AppError::Validation("Order ID and phone are required".to_string()));
  }
  let order = common_steps::find_order(&app_state.db_pool, &p.order_id)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;

  let on_file = [order.guest_phone.as_deref(), Some(order.address.phone.as_str())];
  if !on_file.iter().flatten().any(|phone| phones_match(phone, &p.phone)) {
    warn!(order_id = %order.id, "Tracking phone mismatch.");
    return Err(AppError::Forbidden("Phone number does not match this order".to_string()));
  }
  Ok(HttpResponse::Ok().json(order_with_items(&app_state, order).await?))
}

#[instrument(name = "handler::cancel_order", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<String>,
  req_payload: Option<web::Json<CancelOrderPayload>>,
) -> AppResult<HttpResponse> {
  let reason = req_payload
    .and_then(|p| clean(p.into_inner().reason))
    .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
  let ctx = CancelOrderCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.actor(),
    order_ref: path.into_inner(),
    reason,
    order: None,
    items: Vec::new(),
    updated: None,
    refund_id: None,
  };

  let (_, ctx) = run_flow(&app_state, ctx).await?;
  let order = ctx
    .updated
    .ok_or_else(|| AppError::Internal("Cancellation completed without an order".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Order cancelled successfully",
    "order": order,
    "refund_id": ctx.refund_id,
  })))
}

#[instrument(name = "handler::update_order_status", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id, status = %req_payload.status))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<String>,
  req_payload: web::Json<StatusUpdateInput>,
) -> AppResult<HttpResponse> {
  let ctx = OrderStatusCtxData {
    app_state: app_state.get_ref().clone(),
    actor: admin.0.actor(),
    order_ref: path.into_inner(),
    input: req_payload.into_inner(),
    target: None,
    order: None,
    transition: None,
    updated: None,
  };

  let (outcome, ctx) = run_flow(&app_state, ctx).await?;
  let order = match outcome {
    PipelineResult::Stopped => ctx.order,
    PipelineResult::Completed => ctx.updated,
  }
  .ok_or_else(|| AppError::Internal("Status flow finished without an order".to_string()))?;
  Ok(HttpResponse::Ok().json(order_with_items(&app_state, order).await?))
}

#[instrument(name = "handler::list_orders", skip_all, fields(staff_id = %staff.0.user_id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, staff: StaffUser) -> AppResult<HttpResponse> {
  let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(with_items(&app_state, orders).await?))
}

#[instrument(name = "handler::resend_order_notification", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn resend_notification_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<String>,
) -> AppResult<HttpResponse> {
  let order = common_steps::find_order(&app_state.db_pool, &path.into_inner())
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  let user_id = order
    .user_id
    .ok_or_else(|| AppError::Validation("Guest orders have no in-app notifications".to_string()))?;

  let sent = notification_service::dispatch(
    &app_state.db_pool,
    &app_state.config,
    Draft::order_status(user_id, &order.order_number, order.status),
  )
  .await;
  audit::record_quietly(
    &app_state.db_pool,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "RESEND_ORDER_NOTIFICATION",
      entity: "Order",
      entity_id: Some(order.id.to_string()),
      details: format!("Resent {} notification", order.status),
    },
  )
  .await;

  info!(order_id = %order.id, delivered = sent.is_some(), "Order notification resent.");
  Ok(HttpResponse::Ok().json(json!({ "success": sent.is_some(), "notification": sent })))
}
