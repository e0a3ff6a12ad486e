// hopz-server/src/models/product.rs

use chrono::{DateTime, Utc};
use hopz::inventory::Inventory;
use hopz::pricing::{effective_unit_price, Money};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "product_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
  Active,
  Draft,
  Deleted,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price: Money,
  pub discount_price: Option<Money>,
  pub images: Vec<String>,
  pub sizes: Vec<String>,
  pub colors: Vec<String>,
  pub tags: Vec<String>,
  pub inventory: Json<Inventory>,
  pub stock: i32,
  pub category: String,
  pub age_group: Option<String>,
  pub status: ProductStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn unit_price(&self) -> Money {
    effective_unit_price(self.price, self.discount_price)
  }
}
