// hopz-server/src/web/handlers/admin_return_handlers.rs

//! Back-office view of return and exchange requests.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::return_handlers::{load_return_row, RETURN_ROW_SELECT};
use super::{clean, filter_value, run_flow};
use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::{DecideReturnCtxData, ReturnDecision};
use crate::models::return_request::ReturnRequestRow;
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use hopz::pricing::Money;
use hopz::{ReturnStatus, ReturnType};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize, Debug, Default)]
pub struct ReturnListQuery {
  pub status: Option<String>,
  #[serde(rename = "type")]
  pub return_type: Option<String>,
  pub search: Option<String>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ApprovePayload {
  pub pickup_scheduled: Option<DateTime<Utc>>,
  pub admin_notes: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RejectPayload {
  pub reason: Option<String>,
  pub admin_notes: Option<String>,
}

fn default_restock() -> bool {
  true
}

#[derive(Deserialize, Debug)]
pub struct CompletePayload {
  pub refund_method: Option<String>,
  pub tracking_number: Option<String>,
  pub admin_notes: Option<String>,
  #[serde(default = "default_restock")]
  pub restock_items: bool,
}

#[instrument(name = "handler::admin_list_returns", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn list_returns_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<ReturnListQuery>,
) -> AppResult<HttpResponse> {
  let q = query.into_inner();
  let status = filter_value(q.status).map(|s| ReturnStatus::parse(&s)).transpose()?;
  let return_type = filter_value(q.return_type).map(|t| ReturnType::parse(&t)).transpose()?;
  let search = clean(q.search).map(|s| format!("%{s}%"));
  let page = q.page.unwrap_or(1).max(1);
  let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

  let filter = "WHERE ($1::return_status IS NULL OR r.status = $1)
     AND ($2::return_type IS NULL OR r.return_type = $2)
     AND ($3::text IS NULL OR r.order_id::text ILIKE $3 OR o.order_number ILIKE $3
          OR u.email ILIKE $3 OR u.name ILIKE $3)";

  let total: i64 = sqlx::query_scalar(&format!(
    "SELECT COUNT(*) FROM return_requests r
     JOIN orders o ON o.id = r.order_id
     JOIN users u ON u.id = r.user_id
     {filter}"
  ))
  .bind(status)
  .bind(return_type)
  .bind(&search)
  .fetch_one(&app_state.db_pool)
  .await?;

  let rows = sqlx::query_as::<_, ReturnRequestRow>(&format!(
    "{RETURN_ROW_SELECT} {filter} ORDER BY r.created_at DESC LIMIT $4 OFFSET $5"
  ))
  .bind(status)
  .bind(return_type)
  .bind(&search)
  .bind(limit)
  .bind((page - 1) * limit)
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({
    "return_requests": rows,
    "pagination": {
      "total": total,
      "page": page,
      "limit": limit,
      "pages": (total + limit - 1) / limit,
    },
  })))
}

#[instrument(name = "handler::admin_return_stats", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn return_stats_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let counts: Vec<(ReturnStatus, i64)> =
    sqlx::query_as("SELECT status, COUNT(*) FROM return_requests GROUP BY status")
      .fetch_all(&app_state.db_pool)
      .await?;
  let refunded: Money = sqlx::query_scalar(
    "SELECT COALESCE(SUM(refund_amount), 0)::BIGINT FROM return_requests
     WHERE status = 'COMPLETED' AND return_type = 'RETURN'",
  )
  .fetch_one(&app_state.db_pool)
  .await?;

  let count_of = |wanted: ReturnStatus| counts.iter().find(|(s, _)| *s == wanted).map_or(0, |(_, n)| *n);
  Ok(HttpResponse::Ok().json(json!({
    "total": counts.iter().map(|(_, n)| n).sum::<i64>(),
    "pending": count_of(ReturnStatus::Pending),
    "approved": count_of(ReturnStatus::Approved),
    "rejected": count_of(ReturnStatus::Rejected),
    "completed": count_of(ReturnStatus::Completed),
    "cancelled": count_of(ReturnStatus::Cancelled),
    "total_refunded": refunded,
  })))
}

#[instrument(name = "handler::admin_get_return", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn get_return_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  Ok(HttpResponse::Ok().json(load_return_row(&app_state, path.into_inner()).await?))
}

async fn decide(app_state: &AppState, admin: &AdminUser, return_id: Uuid, decision: ReturnDecision) -> AppResult<HttpResponse> {
  let ctx = DecideReturnCtxData {
    app_state: app_state.clone(),
    actor: admin.0.actor(),
    return_id,
    decision,
    request: None,
    order_number: None,
    updated: None,
  };
  let (_, ctx) = run_flow(app_state, ctx).await?;
  let updated = ctx
    .updated
    .ok_or_else(|| AppError::Internal("Return decision finished without a request".to_string()))?;
  let row = load_return_row(app_state, updated.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "return_request": row })))
}

#[instrument(name = "handler::admin_approve_return", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn approve_return_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: Option<web::Json<ApprovePayload>>,
) -> AppResult<HttpResponse> {
  let p = req_payload.map(web::Json::into_inner).unwrap_or_default();
  let decision = ReturnDecision::Approve {
    pickup_scheduled: p.pickup_scheduled,
    admin_notes: clean(p.admin_notes),
  };
  decide(&app_state, &admin, path.into_inner(), decision).await
}

#[instrument(name = "handler::admin_reject_return", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn reject_return_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<RejectPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  let reason = clean(p.reason).ok_or_else(|| AppError::Validation("Rejection reason is required".to_string()))?;
  let decision = ReturnDecision::Reject {
    reason,
    admin_notes: clean(p.admin_notes),
  };
  decide(&app_state, &admin, path.into_inner(), decision).await
}

#[instrument(name = "handler::admin_complete_return", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn complete_return_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: Option<web::Json<CompletePayload>>,
) -> AppResult<HttpResponse> {
  let decision = match req_payload.map(web::Json::into_inner) {
    Some(p) => ReturnDecision::Complete {
      refund_method: clean(p.refund_method),
      tracking_number: clean(p.tracking_number),
      admin_notes: clean(p.admin_notes),
      restock_items: p.restock_items,
    },
    None => ReturnDecision::Complete {
      refund_method: None,
      tracking_number: None,
      admin_notes: None,
      restock_items: true,
    },
  };
  decide(&app_state, &admin, path.into_inner(), decision).await
}
