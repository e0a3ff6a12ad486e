// hopz-server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::cart_item::CartLineView;
use crate::models::CartItem;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use hopz::cart::{merge_guest_cart, CartLine, MAX_LINE_QUANTITY};

#[derive(Deserialize, Debug)]
pub struct AddToCartPayload {
  pub product_id: Uuid,
  pub quantity: i32,
  pub size: String,
  #[serde(default)]
  pub color: String,
}

fn check_quantity(quantity: i32) -> AppResult<()> {
  if quantity < 1 {
    return Err(AppError::Validation("Quantity must be at least 1".to_string()));
  }
  if quantity > MAX_LINE_QUANTITY {
    return Err(AppError::Validation(format!("Quantity cannot exceed {MAX_LINE_QUANTITY}")));
  }
  Ok(())
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartPayload {
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct MergeCartPayload {
  #[serde(default)]
  pub items: Vec<AddToCartPayload>,
}

const CART_VIEW_SQL: &str = "SELECT c.id, c.product_id, c.quantity, c.size, c.color,
   p.name, p.price, p.discount_price, p.images, p.stock
 FROM cart_items c JOIN products p ON p.id = c.product_id
 WHERE c.user_id = $1 AND p.status = 'ACTIVE'
 ORDER BY c.created_at";

async fn cart_view(app_state: &AppState, user_id: Uuid) -> AppResult<Vec<CartLineView>> {
  let lines = sqlx::query_as::<_, CartLineView>(CART_VIEW_SQL)
    .bind(user_id)
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(lines)
}

#[instrument(name = "handler::get_cart", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> AppResult<HttpResponse> {
  Ok(HttpResponse::Ok().json(cart_view(&app_state, auth_user.user_id).await?))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<AddToCartPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  check_quantity(p.quantity)?;
  if p.size.trim().is_empty() {
    return Err(AppError::Validation("Size is required".to_string()));
  }
  let available: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND status = 'ACTIVE')")
    .bind(p.product_id)
    .fetch_one(&app_state.db_pool)
    .await?;
  if !available {
    return Err(AppError::not_found("Product"));
  }

  let item = sqlx::query_as::<_, CartItem>(
    "INSERT INTO cart_items (user_id, product_id, quantity, size, color) VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (user_id, product_id, size, color)
     DO UPDATE SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $6)
     RETURNING *",
  )
  .bind(auth_user.user_id)
  .bind(p.product_id)
  .bind(p.quantity)
  .bind(p.size.trim())
  .bind(p.color.trim())
  .bind(MAX_LINE_QUANTITY)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(cart_item_id = %item.id, quantity = item.quantity, "Cart line saved.");
  Ok(HttpResponse::Created().json(item))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateCartPayload>,
) -> AppResult<HttpResponse> {
  check_quantity(req_payload.quantity)?;
  let item = sqlx::query_as::<_, CartItem>(
    "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
  )
  .bind(path.into_inner())
  .bind(auth_user.user_id)
  .bind(req_payload.quantity)
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::not_found("Cart item"))?;
  Ok(HttpResponse::Ok().json(item))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
    .bind(path.into_inner())
    .bind(auth_user.user_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::not_found("Cart item"));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from cart" })))
}

#[instrument(name = "handler::clear_cart", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn clear_cart_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> AppResult<HttpResponse> {
  sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(auth_user.user_id)
    .execute(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Cart cleared" })))
}

/// Folds a guest cart into the account cart after login.
#[instrument(name = "handler::merge_cart", skip_all, fields(user_id = %auth_user.user_id, guest_lines = req_payload.items.len()))]
pub async fn merge_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<MergeCartPayload>,
) -> AppResult<HttpResponse> {
  let guest: Vec<CartLine> = req_payload
    .into_inner()
    .items
    .into_iter()
    .map(|i| CartLine {
      product_id: i.product_id,
      size: i.size.trim().to_string(),
      color: i.color.trim().to_string(),
      quantity: i.quantity,
    })
    .collect();

  let mut tx = app_state.db_pool.begin().await?;
  let existing = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE user_id = $1 FOR UPDATE")
    .bind(auth_user.user_id)
    .fetch_all(&mut *tx)
    .await?;
  let server: Vec<CartLine> = existing
    .iter()
    .map(|c| CartLine {
      product_id: c.product_id,
      size: c.size.clone(),
      color: c.color.clone(),
      quantity: c.quantity,
    })
    .collect();

  let merged = merge_guest_cart(&server, &guest);
  for line in &merged {
    // Lines for products that no longer sell are dropped silently.
    sqlx::query(
      "INSERT INTO cart_items (user_id, product_id, quantity, size, color)
       SELECT $1, $2, $3, $4, $5 WHERE EXISTS (SELECT 1 FROM products WHERE id = $2 AND status = 'ACTIVE')
       ON CONFLICT (user_id, product_id, size, color) DO UPDATE SET quantity = EXCLUDED.quantity",
    )
    .bind(auth_user.user_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(&line.size)
    .bind(&line.color)
    .execute(&mut *tx)
    .await?;
  }
  tx.commit().await?;

  info!(lines = merged.len(), "Guest cart merged.");
  Ok(HttpResponse::Ok().json(cart_view(&app_state, auth_user.user_id).await?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quantities_outside_one_line_are_rejected() {
    assert!(check_quantity(1).is_ok());
    assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
    assert!(matches!(check_quantity(0), Err(AppError::Validation(_))));
    assert!(matches!(check_quantity(i32::MAX), Err(AppError::Validation(_))));
  }
}
