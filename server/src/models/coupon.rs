// hopz-server/src/models/coupon.rs

use chrono::{DateTime, Utc};
use hopz::coupon::{CouponRule, DiscountKind};
use hopz::pricing::Money;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Coupon {
  pub id: Uuid,
  pub code: String,
  pub discount_type: DiscountKind,
  pub discount_value: i64,
  pub min_order_value: Option<Money>,
  pub expiry_date: Option<DateTime<Utc>>,
  pub max_uses: Option<i32>,
  pub current_uses: i32,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl Coupon {
  pub fn rule(&self) -> CouponRule {
    CouponRule {
      code: self.code.clone(),
      kind: self.discount_type,
      value: self.discount_value,
      min_order_value: self.min_order_value,
      expiry: self.expiry_date,
      max_uses: self.max_uses,
      current_uses: self.current_uses,
      is_active: self.is_active,
    }
  }
}
