// hopz-server/src/web/handlers/return_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::run_flow;
use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::{CancelReturnCtxData, CreateReturnCtxData, CreateReturnInput};
use crate::models::return_request::ReturnRequestRow;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use hopz::pricing::RefundQuote;

pub(crate) const RETURN_ROW_SELECT: &str = "SELECT r.*, o.order_number, u.email AS user_email, u.name AS user_name
 FROM return_requests r
 JOIN orders o ON o.id = r.order_id
 JOIN users u ON u.id = r.user_id";

#[instrument(name = "handler::create_return", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id, order_ref = %req_payload.order_id))]
pub async fn create_return_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<CreateReturnInput>,
) -> AppResult<HttpResponse> {
  let ctx = CreateReturnCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.actor(),
    input: req_payload.into_inner(),
    return_type: None,
    order: None,
    lines: Vec::new(),
    quote: None,
    created: None,
  };

  let (_, ctx) = run_flow(&app_state, ctx).await?;
  let created = ctx
    .created
    .ok_or_else(|| AppError::Internal("Return flow completed without a request".to_string()))?;
  let message = ctx
    .quote
    .unwrap_or_else(|| RefundQuote::for_request(created.return_type, created.items_total))
    .summary();

  info!(return_id = %created.id, "Return request created.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "return_request": created,
    "message": message,
  })))
}

#[instrument(name = "handler::my_returns", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn my_returns_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> AppResult<HttpResponse> {
  let rows = sqlx::query_as::<_, ReturnRequestRow>(&format!(
    "{RETURN_ROW_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC"
  ))
  .bind(auth_user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(rows))
}

#[instrument(name = "handler::get_return", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_return_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let row = load_return_row(&app_state, path.into_inner()).await?;
  if row.request.user_id != auth_user.user_id && !auth_user.is_admin() {
    return Err(AppError::Forbidden("Not authorized to view this request".to_string()));
  }
  Ok(HttpResponse::Ok().json(row))
}

#[instrument(name = "handler::cancel_return", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn cancel_return_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let ctx = CancelReturnCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.actor(),
    return_id: path.into_inner(),
    request: None,
    updated: None,
  };

  let (_, ctx) = run_flow(&app_state, ctx).await?;
  let updated = ctx
    .updated
    .ok_or_else(|| AppError::Internal("Return cancellation finished without a request".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "return_request": updated })))
}

/// A request joined with its order number and customer.
pub(crate) async fn load_return_row(app_state: &AppState, id: Uuid) -> AppResult<ReturnRequestRow> {
  sqlx::query_as::<_, ReturnRequestRow>(&format!("{RETURN_ROW_SELECT} WHERE r.id = $1"))
    .bind(id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Return request"))
}
