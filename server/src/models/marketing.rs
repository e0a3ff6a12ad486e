// hopz-server/src/models/marketing.rs

use chrono::{DateTime, Utc};
use hopz::coupon::DiscountKind;
use hopz::marketing::{FlashSaleWindow, PopupKind};
use hopz::pricing::Money;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FlashSale {
  pub id: Uuid,
  pub name: String,
  pub discount_type: DiscountKind,
  pub discount_value: i64,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl FlashSale {
  pub fn window(&self) -> FlashSaleWindow {
    FlashSaleWindow {
      discount_type: self.discount_type,
      discount_value: self.discount_value,
      starts_at: self.starts_at,
      ends_at: self.ends_at,
      is_active: self.is_active,
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MarketingPopup {
  pub id: Uuid,
  pub title: String,
  pub content: String,
  pub image: Option<String>,
  pub link: Option<String>,
  pub kind: PopupKind,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

/// One row per cart line of a shopper whose cart is going stale.
#[derive(Debug, Clone, FromRow)]
pub struct AbandonedCartRow {
  pub user_id: Uuid,
  pub email: String,
  pub user_name: Option<String>,
  pub cart_item_id: Uuid,
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub size: String,
  pub color: String,
  pub price: Money,
  pub added_at: DateTime<Utc>,
}
