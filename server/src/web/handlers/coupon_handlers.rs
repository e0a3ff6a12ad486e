// hopz-server/src/web/handlers/coupon_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::Coupon;
use crate::services::audit::{self, AuditEntry};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use hopz::coupon::{self, DiscountKind};
use hopz::pricing::Money;
use hopz::RuleViolation;

#[derive(Deserialize, Debug)]
pub struct CreateCouponPayload {
  pub code: String,
  pub discount_type: DiscountKind,
  pub discount_value: i64,
  pub min_order_value: Option<Money>,
  pub expiry_date: Option<DateTime<Utc>>,
  pub max_uses: Option<i32>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool {
  true
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateCouponPayload {
  pub code: Option<String>,
  pub discount_type: Option<DiscountKind>,
  pub discount_value: Option<i64>,
  pub min_order_value: Option<Money>,
  pub expiry_date: Option<DateTime<Utc>>,
  pub max_uses: Option<i32>,
  pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ValidateCouponPayload {
  pub code: String,
  pub cart_total: Money,
}

fn unique_code_violation(e: sqlx::Error) -> AppError {
  match &e {
    sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict("Coupon code already exists".to_string()),
    _ => AppError::Sqlx(e),
  }
}

fn check_limits(max_uses: Option<i32>, min_order_value: Option<Money>) -> AppResult<()> {
  if max_uses.is_some_and(|m| m < 1) {
    return Err(AppError::Validation("max_uses must be at least 1".to_string()));
  }
  if min_order_value.is_some_and(|m| m.is_negative()) {
    return Err(AppError::Validation("min_order_value cannot be negative".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::list_coupons", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn list_coupons_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(coupons))
}

#[instrument(name = "handler::create_coupon", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id, code = %req_payload.code))]
pub async fn create_coupon_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<CreateCouponPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  let code = coupon::normalize_code(&p.code)?;
  coupon::validate_value(p.discount_type, p.discount_value)?;
  check_limits(p.max_uses, p.min_order_value)?;

  let mut tx = app_state.db_pool.begin().await?;
  let created = sqlx::query_as::<_, Coupon>(
    "INSERT INTO coupons (code, discount_type, discount_value, min_order_value, expiry_date, max_uses, is_active)
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
  )
  .bind(&code)
  .bind(p.discount_type)
  .bind(p.discount_value)
  .bind(p.min_order_value)
  .bind(p.expiry_date)
  .bind(p.max_uses)
  .bind(p.is_active)
  .fetch_one(&mut *tx)
  .await
  .map_err(unique_code_violation)?;

  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "CREATE_COUPON",
      entity: "Coupon",
      entity_id: Some(created.id.to_string()),
      details: format!("Created coupon {code}"),
    },
  )
  .await?;
  tx.commit().await?;

  Ok(HttpResponse::Created().json(created))
}

#[instrument(name = "handler::update_coupon", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn update_coupon_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateCouponPayload>,
) -> AppResult<HttpResponse> {
  let coupon_id = path.into_inner();
  let p = req_payload.into_inner();

  let mut tx = app_state.db_pool.begin().await?;
  let mut current = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1 FOR UPDATE")
    .bind(coupon_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Coupon"))?;

  if let Some(raw) = p.code {
    current.code = coupon::normalize_code(&raw)?;
  }
  if let Some(kind) = p.discount_type {
    current.discount_type = kind;
  }
  if let Some(value) = p.discount_value {
    current.discount_value = value;
  }
  coupon::validate_value(current.discount_type, current.discount_value)?;
  check_limits(p.max_uses, p.min_order_value)?;
  if p.min_order_value.is_some() {
    current.min_order_value = p.min_order_value;
  }
  if p.expiry_date.is_some() {
    current.expiry_date = p.expiry_date;
  }
  if p.max_uses.is_some() {
    current.max_uses = p.max_uses;
  }
  if let Some(active) = p.is_active {
    current.is_active = active;
  }

  let updated = sqlx::query_as::<_, Coupon>(
    "UPDATE coupons SET code = $2, discount_type = $3, discount_value = $4, min_order_value = $5,
       expiry_date = $6, max_uses = $7, is_active = $8
     WHERE id = $1 RETURNING *",
  )
  .bind(coupon_id)
  .bind(&current.code)
  .bind(current.discount_type)
  .bind(current.discount_value)
  .bind(current.min_order_value)
  .bind(current.expiry_date)
  .bind(current.max_uses)
  .bind(current.is_active)
  .fetch_one(&mut *tx)
  .await
  .map_err(unique_code_violation)?;

  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "UPDATE_COUPON",
      entity: "Coupon",
      entity_id: Some(coupon_id.to_string()),
      details: format!("Updated coupon {}", updated.code),
    },
  )
  .await?;
  tx.commit().await?;

  Ok(HttpResponse::Ok().json(updated))
}

#[instrument(name = "handler::delete_coupon", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn delete_coupon_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let coupon_id = path.into_inner();
  let mut tx = app_state.db_pool.begin().await?;
  let code: String = sqlx::query_scalar("DELETE FROM coupons WHERE id = $1 RETURNING code")
    .bind(coupon_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Coupon"))?;

  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "DELETE_COUPON",
      entity: "Coupon",
      entity_id: Some(coupon_id.to_string()),
      details: format!("Deleted coupon {code}"),
    },
  )
  .await?;
  tx.commit().await?;

  Ok(HttpResponse::Ok().json(json!({ "message": "Coupon deleted" })))
}

/// Checks a code against a cart total without consuming a use.
#[instrument(name = "handler::validate_coupon", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn validate_coupon_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ValidateCouponPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  if p.cart_total.is_negative() {
    return Err(AppError::Validation("cart_total cannot be negative".to_string()));
  }
  let code = p.code.trim().to_uppercase();

  let found = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1 AND is_active")
    .bind(&code)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or(RuleViolation::CouponInactive)?;

  let discount = found.rule().evaluate(p.cart_total, Utc::now())?;
  Ok(HttpResponse::Ok().json(json!({
    "id": found.id,
    "code": found.code,
    "discount_type": found.discount_type,
    "discount_value": found.discount_value,
    "discount_amount": discount,
  })))
}
