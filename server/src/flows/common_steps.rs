// hopz-server/src/flows/common_steps.rs

//! Queries and write helpers shared by several flows.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderItem, ReturnRequest};
use hopz::inventory::Inventory;
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};
use tracing::{event, Level};
use uuid::Uuid;

/// Looks an order up by UUID or by its `HHZ-…` order number.
pub async fn find_order<'e>(executor: impl PgExecutor<'e>, order_ref: &str) -> AppResult<Option<Order>> {
  let order_ref = order_ref.trim();
  let order = match Uuid::parse_str(order_ref) {
    Ok(id) => {
      sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
    }
    Err(_) => {
      sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_ref.to_uppercase())
        .fetch_optional(executor)
        .await?
    }
  };
  Ok(order)
}

/// Re-reads an order inside a transaction and holds its row lock until the
/// transaction ends. Status decisions that lead to writes are made on this row.
pub async fn lock_order(conn: &mut PgConnection, id: Uuid) -> AppResult<Order> {
  sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Order"))
}

pub async fn lock_return_request(conn: &mut PgConnection, id: Uuid) -> AppResult<ReturnRequest> {
  sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = $1 FOR UPDATE")
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Return request"))
}

pub async fn load_order_items<'e>(executor: impl PgExecutor<'e>, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
  let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY name")
    .bind(order_id)
    .fetch_all(executor)
    .await?;
  Ok(items)
}

pub async fn load_return_request<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> AppResult<ReturnRequest> {
  sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = $1")
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("Return request"))
}

pub async fn account_name<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> AppResult<Option<String>> {
  let name: Option<Option<String>> = sqlx::query_scalar("SELECT name FROM users WHERE id = $1")
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
  Ok(name.flatten())
}

/// Owners see their own orders; admins see everything.
pub fn ensure_order_access(order: &Order, user_id: Uuid, is_admin: bool) -> AppResult<()> {
  if is_admin || order.user_id == Some(user_id) {
    Ok(())
  } else {
    Err(AppError::Forbidden("Not authorized to access this order".to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
  Reserve,
  Restock,
  /// Stock take: `qty` becomes the new count for the size.
  Count,
}

/// Moves `qty` units of one size in or out of a product's inventory and
/// recomputes its total stock. Missing products are logged and skipped;
/// the return value says whether the product was found.
pub async fn adjust_stock(
  conn: &mut PgConnection,
  product_id: Uuid,
  size: &str,
  qty: i32,
  change: StockChange,
) -> AppResult<bool> {
  let current: Option<Json<Inventory>> = sqlx::query_scalar("SELECT inventory FROM products WHERE id = $1 FOR UPDATE")
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
  let Some(Json(mut inventory)) = current else {
    event!(Level::WARN, %product_id, "Product vanished while adjusting stock.");
    return Ok(false);
  };

  match change {
    StockChange::Reserve => {
      if !inventory.reserve(size, qty) {
        event!(Level::WARN, %product_id, size, qty, "Size not tracked in inventory; stock left unchanged.");
      }
    }
    StockChange::Restock => inventory.restock(size, qty),
    StockChange::Count => inventory.set_stock(size, qty),
  }

  let total = inventory.total();
  sqlx::query("UPDATE products SET inventory = $2, stock = $3, updated_at = NOW() WHERE id = $1")
    .bind(product_id)
    .bind(Json(&inventory))
    .bind(total)
    .execute(&mut *conn)
    .await?;
  Ok(true)
}

pub async fn restock_order_items(conn: &mut PgConnection, items: &[OrderItem]) -> AppResult<()> {
  for item in items {
    adjust_stock(conn, item.product_id, &item.size, item.quantity, StockChange::Restock).await?;
  }
  Ok(())
}
