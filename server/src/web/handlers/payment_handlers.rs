// hopz-server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps;
use crate::flows::place_order_flow::announce_confirmed_order;
use crate::models::Order;
use crate::services::payment_gateway;
use crate::state::AppState;
use crate::web::extractors::OptionalUser;
use chrono::Utc;
use hopz::lifecycle::order::SYSTEM_ACTOR;
use hopz::{OrderStatus, PaymentStatus};

#[derive(Deserialize, Debug)]
pub struct PaymentIntentPayload {
  pub order_id: String,
}

#[derive(Deserialize, Debug)]
pub struct VerifyPaymentPayload {
  pub order_id: String,
  pub gateway_order_id: String,
  pub gateway_payment_id: String,
  pub signature: String,
}

/// Signed-in callers may only pay for their own orders; guest orders are open.
fn ensure_payer(order: &Order, user: &OptionalUser) -> AppResult<()> {
  match (order.user_id, &user.0) {
    (None, _) => Ok(()),
    (Some(owner), Some(caller)) if owner == caller.user_id || caller.is_admin() => Ok(()),
    (Some(_), Some(_)) => Err(AppError::Forbidden("Not authorized to pay for this order".to_string())),
    (Some(_), None) => Err(AppError::Auth("No token provided".to_string())),
  }
}

/// A checkout signature only proves payment for the gateway order it was
/// issued against, so that id must be the one stored on our order.
///
/// # Arguments
/// * `stored` - The gateway order id recorded when the payment intent was created.
/// * `claimed` - The gateway order id the client sent along with the signature.
fn ensure_gateway_order(stored: Option<&str>, claimed: &str) -> AppResult<()> {
  match stored {
    Some(stored) if stored == claimed => Ok(()),
    _ => Err(AppError::Payment("Payment does not belong to this order".to_string())),
  }
}

#[instrument(name = "handler::payment_intent", skip(app_state, user), fields(order_ref = %req_payload.order_id))]
pub async fn create_intent_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  req_payload: web::Json<PaymentIntentPayload>,
) -> AppResult<HttpResponse> {
  let order = common_steps::find_order(&app_state.db_pool, &req_payload.order_id)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  ensure_payer(&order, &user)?;
  if order.payment_status == PaymentStatus::Completed {
    return Err(AppError::Validation("Order is already paid".to_string()));
  }
  if order.status.is_terminal() {
    return Err(AppError::Validation(format!("Order is {}", order.status.label())));
  }

  let gateway_order = payment_gateway::create_gateway_order(&order.order_number, order.total).await?;
  sqlx::query("UPDATE orders SET gateway_order_id = $2, updated_at = NOW() WHERE id = $1")
    .bind(order.id)
    .bind(&gateway_order.id)
    .execute(&app_state.db_pool)
    .await?;

  info!(order_id = %order.id, gateway_order_id = %gateway_order.id, "Payment intent created.");
  Ok(HttpResponse::Ok().json(json!({
    "id": gateway_order.id,
    "amount": gateway_order.amount,
    "currency": gateway_order.currency,
    "receipt": gateway_order.receipt,
    "order_id": order.id,
  })))
}

#[instrument(name = "handler::verify_payment", skip(app_state, user, req_payload), fields(order_ref = %req_payload.order_id))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  req_payload: web::Json<VerifyPaymentPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  payment_gateway::verify_checkout_signature(
    &app_state.config.payment_key_secret,
    &p.gateway_order_id,
    &p.gateway_payment_id,
    &p.signature,
  )?;

  let mut tx = app_state.db_pool.begin().await?;
  let found = common_steps::find_order(&mut *tx, &p.order_id)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  let order = common_steps::lock_order(&mut tx, found.id).await?;
  ensure_payer(&order, &user)?;
  if let Err(e) = ensure_gateway_order(order.gateway_order_id.as_deref(), &p.gateway_order_id) {
    warn!(order_id = %order.id, gateway_order_id = %p.gateway_order_id, "Signature presented for another gateway order.");
    return Err(e);
  }
  if order.payment_status == PaymentStatus::Completed {
    tx.rollback().await?;
    return Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })));
  }
  if order.status.is_terminal() {
    return Err(AppError::Payment(format!("Order is {}", order.status.label())));
  }

  let confirms = order.status == OrderStatus::Pending;
  let mut history = order.status_history.0.clone();
  let status = if confirms {
    history.record(
      OrderStatus::Confirmed,
      SYSTEM_ACTOR,
      Some(format!("Payment {} verified", p.gateway_payment_id)),
      Utc::now(),
    );
    OrderStatus::Confirmed
  } else {
    order.status
  };

  let updated = sqlx::query_as::<_, Order>(
    "UPDATE orders SET payment_status = $2, transaction_id = $3, status = $4,
       status_history = $5, updated_at = NOW()
     WHERE id = $1 RETURNING *",
  )
  .bind(order.id)
  .bind(PaymentStatus::Completed)
  .bind(&p.gateway_payment_id)
  .bind(status)
  .bind(Json(&history))
  .fetch_one(&mut *tx)
  .await?;
  tx.commit().await?;

  info!(order_id = %updated.id, confirmed = confirms, "Payment verified.");
  if confirms {
    let account_email = user.0.as_ref().map(|u| u.email.clone());
    announce_confirmed_order(&app_state, &updated, account_email.as_deref()).await;
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": updated })))
}

#[instrument(name = "handler::payment_webhook", skip_all, fields(bytes = body.len()))]
pub async fn webhook_handler(req: HttpRequest, body: web::Bytes) -> AppResult<HttpResponse> {
  let signature = req
    .headers()
    .get("x-razorpay-signature")
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);
  match serde_json::from_slice::<serde_json::Value>(&body) {
    Ok(event) => info!(
      event = event.get("event").and_then(|e| e.as_str()).unwrap_or("unknown"),
      signed = signature.is_some(),
      "Payment webhook received."
    ),
    Err(e) => warn!(error = %e, "Payment webhook body is not JSON."),
  }
  Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signature_for_another_gateway_order_is_refused() {
    assert!(ensure_gateway_order(Some("order_a"), "order_a").is_ok());
    assert!(matches!(
      ensure_gateway_order(Some("order_b"), "order_a"),
      Err(AppError::Payment(_))
    ));
  }

  #[test]
  fn order_without_payment_intent_cannot_be_verified() {
    assert!(matches!(ensure_gateway_order(None, "order_a"), Err(AppError::Payment(_))));
  }
}
