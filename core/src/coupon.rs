// hopz/src/coupon.rs
use crate::error::RuleViolation;
use crate::pricing::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CODE_MIN_LEN: usize = 3;
pub const CODE_MAX_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "discount_kind", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum DiscountKind {
  /// `value` is a whole percentage.
  Percentage,
  /// `value` is an amount in paise.
  Flat,
}

/// Trims and upper-cases a coupon code, rejecting lengths outside 3..=20.
pub fn normalize_code(raw: &str) -> Result<String, RuleViolation> {
  let code = raw.trim().to_uppercase();
  let len = code.chars().count();
  if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&len) {
    return Err(RuleViolation::InvalidCoupon(format!(
      "code must be {CODE_MIN_LEN}-{CODE_MAX_LEN} characters"
    )));
  }
  Ok(code)
}

pub fn validate_value(kind: DiscountKind, value: i64) -> Result<(), RuleViolation> {
  match kind {
    DiscountKind::Percentage if !(1..=100).contains(&value) => Err(RuleViolation::InvalidCoupon(
      "percentage must be between 1 and 100".into(),
    )),
    DiscountKind::Flat if value <= 0 => Err(RuleViolation::InvalidCoupon("flat discount must be positive".into())),
    _ => Ok(()),
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRule {
  pub code: String,
  pub kind: DiscountKind,
  pub value: i64,
  pub min_order_value: Option<Money>,
  pub expiry: Option<DateTime<Utc>>,
  pub max_uses: Option<i32>,
  pub current_uses: i32,
  pub is_active: bool,
}

impl CouponRule {
  /// Discount this coupon grants on `cart_total`, never more than the cart itself.
  pub fn evaluate(&self, cart_total: Money, now: DateTime<Utc>) -> Result<Money, RuleViolation> {
    if !self.is_active {
      return Err(RuleViolation::CouponInactive);
    }
    if self.expiry.is_some_and(|exp| exp < now) {
      return Err(RuleViolation::CouponExpired);
    }
    if self.max_uses.is_some_and(|max| self.current_uses >= max) {
      return Err(RuleViolation::CouponExhausted);
    }
    if let Some(minimum) = self.min_order_value {
      if cart_total < minimum {
        return Err(RuleViolation::BelowMinimumOrder { minimum });
      }
    }

    let discount = match self.kind {
      DiscountKind::Percentage => cart_total.percent(self.value),
      DiscountKind::Flat => Money::from_paise(self.value),
    };
    Ok(discount.min(cart_total))
  }
}
