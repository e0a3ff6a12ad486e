// hopz-server/src/web/handlers/marketing_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::clean;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{AbandonedCartRow, FlashSale, MarketingPopup};
use crate::services::audit::{self, AuditEntry};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, StaffUser};
use hopz::coupon::DiscountKind;
use hopz::marketing::{abandoned_cutoff, FlashSaleWindow, PopupKind};
use hopz::pricing::Money;

fn default_true() -> bool {
  true
}

#[derive(Deserialize, Debug)]
pub struct FlashSalePayload {
  pub name: String,
  pub discount_type: DiscountKind,
  pub discount_value: i64,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

#[derive(Deserialize, Debug)]
pub struct PopupPayload {
  pub title: String,
  pub content: String,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub link: Option<String>,
  #[serde(rename = "type")]
  pub kind: PopupKind,
  #[serde(default)]
  pub active: bool,
}

#[instrument(name = "handler::create_flash_sale", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn create_flash_sale_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<FlashSalePayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  let name = clean(Some(p.name)).ok_or_else(|| AppError::Validation("Flash sale name is required".to_string()))?;
  FlashSaleWindow {
    discount_type: p.discount_type,
    discount_value: p.discount_value,
    starts_at: p.starts_at,
    ends_at: p.ends_at,
    is_active: p.is_active,
  }
  .validate()?;

  let sale = sqlx::query_as::<_, FlashSale>(
    "INSERT INTO flash_sales (name, discount_type, discount_value, starts_at, ends_at, is_active)
     VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
  )
  .bind(&name)
  .bind(p.discount_type)
  .bind(p.discount_value)
  .bind(p.starts_at)
  .bind(p.ends_at)
  .bind(p.is_active)
  .fetch_one(&app_state.db_pool)
  .await?;

  audit::record_quietly(
    &app_state.db_pool,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "CREATE_FLASH_SALE",
      entity: "FlashSale",
      entity_id: Some(sale.id.to_string()),
      details: format!("{name} from {} to {}", sale.starts_at, sale.ends_at),
    },
  )
  .await;
  info!(flash_sale_id = %sale.id, "Flash sale scheduled.");
  Ok(HttpResponse::Created().json(sale))
}

#[instrument(name = "handler::list_flash_sales", skip_all, fields(staff_id = %staff.0.user_id))]
pub async fn list_flash_sales_handler(app_state: web::Data<AppState>, staff: StaffUser) -> AppResult<HttpResponse> {
  let sales = sqlx::query_as::<_, FlashSale>("SELECT * FROM flash_sales ORDER BY starts_at DESC")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(sales))
}

/// The sale running right now, or `null`. When windows overlap the one that
/// started last wins.
#[instrument(name = "handler::active_flash_sale", skip_all)]
pub async fn active_flash_sale_handler(app_state: web::Data<AppState>) -> AppResult<HttpResponse> {
  let sale = sqlx::query_as::<_, FlashSale>(
    "SELECT * FROM flash_sales WHERE is_active AND starts_at <= NOW() AND ends_at >= NOW()
     ORDER BY starts_at DESC LIMIT 1",
  )
  .fetch_optional(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(sale))
}

#[instrument(name = "handler::create_popup", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn create_popup_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<PopupPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  let title = clean(Some(p.title)).ok_or_else(|| AppError::Validation("Popup title is required".to_string()))?;
  let content = clean(Some(p.content)).ok_or_else(|| AppError::Validation("Popup content is required".to_string()))?;

  let popup = sqlx::query_as::<_, MarketingPopup>(
    "INSERT INTO marketing_popups (title, content, image, link, kind, active)
     VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
  )
  .bind(&title)
  .bind(&content)
  .bind(clean(p.image))
  .bind(clean(p.link))
  .bind(p.kind)
  .bind(p.active)
  .fetch_one(&app_state.db_pool)
  .await?;

  audit::record_quietly(
    &app_state.db_pool,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "CREATE_POPUP",
      entity: "MarketingPopup",
      entity_id: Some(popup.id.to_string()),
      details: title,
    },
  )
  .await;
  Ok(HttpResponse::Created().json(popup))
}

#[instrument(name = "handler::active_popup", skip_all)]
pub async fn active_popup_handler(app_state: web::Data<AppState>) -> AppResult<HttpResponse> {
  let popup = sqlx::query_as::<_, MarketingPopup>(
    "SELECT * FROM marketing_popups WHERE active ORDER BY created_at DESC LIMIT 1",
  )
  .fetch_optional(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(popup))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbandonedLine {
  pub cart_item_id: Uuid,
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub size: String,
  pub color: String,
  pub price: Money,
  pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbandonedCart {
  pub id: Uuid,
  pub email: String,
  pub name: Option<String>,
  pub cart_value: Money,
  pub cart_items: Vec<AbandonedLine>,
}

/// Rows arrive ordered by shopper; consecutive rows fold into one cart.
fn group_abandoned(rows: Vec<AbandonedCartRow>) -> Vec<AbandonedCart> {
  let mut carts: Vec<AbandonedCart> = Vec::new();
  for row in rows {
    let line = AbandonedLine {
      cart_item_id: row.cart_item_id,
      product_id: row.product_id,
      product_name: row.product_name,
      quantity: row.quantity,
      size: row.size,
      color: row.color,
      price: row.price,
      added_at: row.added_at,
    };
    let line_total = line.price * line.quantity;
    match carts.last_mut() {
      Some(cart) if cart.id == row.user_id => {
        cart.cart_value += line_total;
        cart.cart_items.push(line);
      }
      _ => carts.push(AbandonedCart {
        id: row.user_id,
        email: row.email,
        name: row.user_name,
        cart_value: line_total,
        cart_items: vec![line],
      }),
    }
  }
  carts
}

/// Shoppers holding cart lines who have not ordered in the last day.
#[instrument(name = "handler::abandoned_carts", skip_all, fields(staff_id = %staff.0.user_id))]
pub async fn abandoned_carts_handler(app_state: web::Data<AppState>, staff: StaffUser) -> AppResult<HttpResponse> {
  let rows = sqlx::query_as::<_, AbandonedCartRow>(
    "SELECT u.id AS user_id, u.email, u.name AS user_name,
       c.id AS cart_item_id, c.product_id, p.name AS product_name, c.quantity, c.size, c.color,
       COALESCE(p.discount_price, p.price) AS price, c.created_at AS added_at
     FROM cart_items c
     JOIN users u ON u.id = c.user_id
     JOIN products p ON p.id = c.product_id
     WHERE NOT EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id AND o.created_at >= $1)
     ORDER BY u.id, c.created_at",
  )
  .bind(abandoned_cutoff(Utc::now()))
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(group_abandoned(rows)))
}
