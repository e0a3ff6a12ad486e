// hopz-server/src/models/cart_item.rs

use chrono::{DateTime, Utc};
use hopz::pricing::Money;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub size: String,
  pub color: String,
  pub created_at: DateTime<Utc>,
}

/// A cart row joined with the product fields the cart page shows.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLineView {
  pub id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub size: String,
  pub color: String,
  pub name: String,
  pub price: Money,
  pub discount_price: Option<Money>,
  pub images: Vec<String>,
  pub stock: i32,
}
