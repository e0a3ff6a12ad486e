// hopz-server/src/models/order_item.rs

use hopz::lifecycle::returns::OrderLine;
use hopz::pricing::{Money, Priced};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  pub price: Money,
  pub quantity: i32,
  pub size: String,
  pub color: String,
}

impl From<&OrderItem> for OrderLine {
  fn from(i: &OrderItem) -> Self {
    OrderLine {
      order_item_id: i.id,
      product_id: i.product_id,
      name: i.name.clone(),
      price: i.price,
      quantity: i.quantity,
      size: i.size.clone(),
      color: i.color.clone(),
    }
  }
}

impl Priced for OrderItem {
  fn unit_price(&self) -> Money {
    self.price
  }
  fn quantity(&self) -> i32 {
    self.quantity
  }
}
