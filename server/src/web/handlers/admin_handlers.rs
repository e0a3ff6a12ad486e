// hopz-server/src/web/handlers/admin_handlers.rs

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps::{self, StockChange};
use crate::models::{AuditLog, PublicUser, Role, User};
use crate::services::audit::{self, AuditEntry};
use crate::services::shipping_label;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, StaffUser};
use hopz::pricing::Money;
use hopz::OrderStatus;

const AUDIT_LOG_LIMIT: i64 = 100;

#[derive(Deserialize, Debug)]
pub struct RolePayload {
  pub role: Role,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserSummary {
  pub id: Uuid,
  pub email: String,
  pub name: Option<String>,
  pub phone: Option<String>,
  pub role: Role,
  pub created_at: DateTime<Utc>,
  pub order_count: i64,
}

#[derive(Deserialize, Debug)]
pub struct StockCount {
  pub product_id: Uuid,
  pub size: String,
  pub stock: i32,
}

#[derive(Deserialize, Debug)]
pub struct BulkStockPayload {
  #[serde(default)]
  pub updates: Vec<StockCount>,
}

fn check_stock_counts(updates: &[StockCount]) -> AppResult<()> {
  if updates.is_empty() {
    return Err(AppError::Validation("No stock updates supplied".to_string()));
  }
  if let Some(bad) = updates.iter().find(|u| u.stock < 0 || u.size.trim().is_empty()) {
    return Err(AppError::Validation(format!(
      "Invalid stock count for product {} size '{}'",
      bad.product_id, bad.size
    )));
  }
  Ok(())
}

/// Whether deleting an order in this status should hand its units back.
/// Shipped goods have left the warehouse; cancelled ones were restocked already.
fn holds_reserved_stock(status: OrderStatus) -> bool {
  matches!(status, OrderStatus::Pending | OrderStatus::Confirmed)
}

#[instrument(name = "handler::admin_stats", skip_all, fields(user_id = %staff.0.user_id))]
pub async fn stats_handler(app_state: web::Data<AppState>, staff: StaffUser) -> AppResult<HttpResponse> {
  let (orders, revenue, users, products, pending_returns): (i64, Money, i64, i64, i64) = sqlx::query_as(
    "SELECT
       (SELECT COUNT(*) FROM orders),
       (SELECT COALESCE(SUM(total), 0)::BIGINT FROM orders WHERE status <> 'CANCELLED'),
       (SELECT COUNT(*) FROM users),
       (SELECT COUNT(*) FROM products WHERE status <> 'DELETED'),
       (SELECT COUNT(*) FROM return_requests WHERE status = 'PENDING')",
  )
  .fetch_one(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({
    "total_orders": orders,
    "total_revenue": revenue,
    "total_users": users,
    "total_products": products,
    "pending_returns": pending_returns,
  })))
}

#[instrument(name = "handler::audit_logs", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn audit_logs_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let logs = sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs ORDER BY created_at DESC LIMIT $1")
    .bind(AUDIT_LOG_LIMIT)
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(logs))
}

#[instrument(name = "handler::update_user_role", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id, role = ?req_payload.role))]
pub async fn update_role_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<RolePayload>,
) -> AppResult<HttpResponse> {
  let target_id = path.into_inner();
  let role = req_payload.role;
  if target_id == admin.0.user_id && role != Role::Admin {
    return Err(AppError::Validation("You cannot remove your own admin role".to_string()));
  }

  let mut tx = app_state.db_pool.begin().await?;
  let user = sqlx::query_as::<_, User>("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
    .bind(target_id)
    .bind(role)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("User"))?;
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "UPDATE_USER_ROLE",
      entity: "User",
      entity_id: Some(target_id.to_string()),
      details: format!("Set role of {} to {:?}", user.email, role),
    },
  )
  .await?;
  tx.commit().await?;

  info!(user_id = %target_id, "User role changed.");
  Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[instrument(name = "handler::admin_list_users", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn list_users_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let users = sqlx::query_as::<_, UserSummary>(
    "SELECT u.id, u.email, u.name, u.phone, u.role, u.created_at,
       (SELECT COUNT(*) FROM orders o WHERE o.user_id = u.id) AS order_count
     FROM users u ORDER BY u.created_at DESC",
  )
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(users))
}

/// Applies a stock take. Each entry overwrites one size's count; unknown
/// products are skipped and left out of the returned count.
#[instrument(name = "handler::bulk_stock", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id, entries = req_payload.updates.len()))]
pub async fn bulk_stock_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<BulkStockPayload>,
) -> AppResult<HttpResponse> {
  let updates = req_payload.into_inner().updates;
  check_stock_counts(&updates)?;

  let mut tx = app_state.db_pool.begin().await?;
  let mut updated = 0usize;
  for u in &updates {
    if common_steps::adjust_stock(&mut tx, u.product_id, u.size.trim(), u.stock, StockChange::Count).await? {
      updated += 1;
    }
  }
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "BULK_STOCK_UPDATE",
      entity: "Product",
      entity_id: None,
      details: format!("Updated {updated} of {} size counts", updates.len()),
    },
  )
  .await?;
  tx.commit().await?;

  info!(updated, "Bulk stock update applied.");
  Ok(HttpResponse::Ok().json(json!({
    "message": format!("Successfully updated stock for {updated} entries"),
    "count": updated,
  })))
}

/// Plain-text label, opened in a new tab; staff pass their token as `?token=`.
#[instrument(name = "handler::shipping_label", skip(app_state, staff), fields(staff_id = %staff.0.user_id))]
pub async fn shipping_label_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<String>,
) -> AppResult<HttpResponse> {
  let order = common_steps::find_order(&app_state.db_pool, &path.into_inner())
    .await?
    .ok_or_else(|| AppError::not_found("Order"))?;
  let items = common_steps::load_order_items(&app_state.db_pool, order.id).await?;

  let disposition = ContentDisposition {
    disposition: DispositionType::Inline,
    parameters: vec![DispositionParam::Filename(shipping_label::file_name(&order))],
  };
  Ok(
    HttpResponse::Ok()
      .content_type("text/plain; charset=utf-8")
      .insert_header((header::CONTENT_DISPOSITION, disposition))
      .body(shipping_label::render(&order, &items)),
  )
}

/// Removes an order with its lines and return requests. Units still reserved
/// for it go back on the shelf.
#[instrument(name = "handler::delete_order", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let order_id = path.into_inner();
  let mut tx = app_state.db_pool.begin().await?;
  let order = common_steps::lock_order(&mut tx, order_id).await?;
  let items = common_steps::load_order_items(&mut *tx, order.id).await?;

  if holds_reserved_stock(order.status) {
    common_steps::restock_order_items(&mut tx, &items).await?;
  } else {
    warn!(order_id = %order.id, status = %order.status, "Deleting order without restocking.");
  }
  sqlx::query("DELETE FROM orders WHERE id = $1")
    .bind(order.id)
    .execute(&mut *tx)
    .await?;
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "DELETE_ORDER",
      entity: "Order",
      entity_id: Some(order.id.to_string()),
      details: format!("Deleted order #{} with {} items. Total: {}", order.order_number, items.len(), order.total),
    },
  )
  .await?;
  tx.commit().await?;

  info!(order_id = %order.id, "Order deleted.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Order deleted successfully" })))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn count(stock: i32, size: &str) -> StockCount {
    StockCount {
      product_id: Uuid::new_v4(),
      size: size.into(),
      stock,
    }
  }

  #[test]
  fn stock_counts_must_be_whole_and_sized() {
    assert!(check_stock_counts(&[count(0, "6C"), count(12, "7C")]).is_ok());
    assert!(check_stock_counts(&[]).is_err());
    assert!(check_stock_counts(&[count(-1, "6C")]).is_err());
    assert!(check_stock_counts(&[count(3, " ")]).is_err());
  }

  #[test]
  fn only_unshipped_orders_give_stock_back() {
    assert!(holds_reserved_stock(OrderStatus::Pending));
    assert!(holds_reserved_stock(OrderStatus::Confirmed));
    assert!(!holds_reserved_stock(OrderStatus::Shipped));
    assert!(!holds_reserved_stock(OrderStatus::Cancelled));
    assert!(!holds_reserved_stock(OrderStatus::Delivered));
  }
}
