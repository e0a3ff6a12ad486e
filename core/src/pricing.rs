// hopz/src/pricing.rs

//! Money arithmetic, refund quotes and order totals.

use crate::lifecycle::returns::{ReturnLine, ReturnType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

/// An amount in paise (1 ₹ = 100 paise). Serialised as a bare integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
pub struct Money(i64);

impl Money {
  pub const ZERO: Money = Money(0);

  pub const fn from_paise(paise: i64) -> Self {
    Money(paise)
  }

  pub const fn from_rupees(rupees: i64) -> Self {
    Money(rupees * 100)
  }

  pub const fn paise(self) -> i64 {
    self.0
  }

  pub fn saturating_sub(self, rhs: Money) -> Money {
    Money(self.0.saturating_sub(rhs.0).max(0))
  }

  pub fn is_zero(self) -> bool {
    self.0 == 0
  }

  pub fn is_negative(self) -> bool {
    self.0 < 0
  }

  /// `percent` of this amount, rounded down to the paisa.
  pub fn percent(self, percent: i64) -> Money {
    Money(self.0 * percent / 100)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    write!(f, "{sign}₹{}.{:02}", abs / 100, abs % 100)
  }
}

impl Add for Money {
  type Output = Money;
  fn add(self, rhs: Money) -> Money {
    Money(self.0 + rhs.0)
  }
}

impl AddAssign for Money {
  fn add_assign(&mut self, rhs: Money) {
    self.0 += rhs.0;
  }
}

impl Sub for Money {
  type Output = Money;
  fn sub(self, rhs: Money) -> Money {
    Money(self.0 - rhs.0)
  }
}

impl Mul<i32> for Money {
  type Output = Money;
  fn mul(self, qty: i32) -> Money {
    Money(self.0 * i64::from(qty))
  }
}

impl Sum for Money {
  fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
    iter.fold(Money::ZERO, Add::add)
  }
}

/// Flat courier fee deducted from every RETURN refund.
pub const PICKUP_CHARGE: Money = Money::from_rupees(50);

/// Anything priced per unit with a quantity.
pub trait Priced {
  fn unit_price(&self) -> Money;
  fn quantity(&self) -> i32;
}

impl Priced for ReturnLine {
  fn unit_price(&self) -> Money {
    self.price
  }
  fn quantity(&self) -> i32 {
    self.quantity
  }
}

impl Priced for (Money, i32) {
  fn unit_price(&self) -> Money {
    self.0
  }
  fn quantity(&self) -> i32 {
    self.1
  }
}

pub fn items_total<P: Priced>(lines: &[P]) -> Money {
  lines.iter().map(|l| l.unit_price() * l.quantity()).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundQuote {
  pub items_total: Money,
  pub pickup_charge: Money,
  /// `None` for exchanges, which never pay out.
  pub refund_amount: Option<Money>,
}

impl RefundQuote {
  pub fn for_request(kind: ReturnType, items_total: Money) -> Self {
    match kind {
      ReturnType::Return => RefundQuote {
        items_total,
        pickup_charge: PICKUP_CHARGE,
        refund_amount: Some(items_total.saturating_sub(PICKUP_CHARGE)),
      },
      ReturnType::Exchange => RefundQuote {
        items_total,
        pickup_charge: Money::ZERO,
        refund_amount: None,
      },
    }
  }

  /// The sentence shown to the customer once the request is filed.
  pub fn summary(&self) -> String {
    match self.refund_amount {
      Some(refund) => format!(
        "Return request submitted. Refund of {refund} will be processed after pickup ({} pickup charge deducted).",
        self.pickup_charge
      ),
      None => "Exchange request submitted. Exchange is free of charge.".to_string(),
    }
  }
}

/// The discount price when there is one and it undercuts the list price.
pub fn effective_unit_price(price: Money, discount_price: Option<Money>) -> Money {
  match discount_price {
    Some(d) if d < price && !d.is_negative() => d,
    _ => price,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
  /// Subtotals at or above this ship free.
  pub free_threshold: Money,
  pub fee: Money,
}

impl Default for ShippingPolicy {
  fn default() -> Self {
    ShippingPolicy {
      free_threshold: Money::from_rupees(499),
      fee: Money::ZERO,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
  pub subtotal: Money,
  pub discount: Money,
  pub shipping: Money,
  /// Catalogue prices are tax-inclusive.
  pub tax: Money,
  pub total: Money,
}

impl OrderTotals {
  pub fn compute<P: Priced>(lines: &[P], coupon_discount: Money, shipping: ShippingPolicy) -> Self {
    let subtotal = items_total(lines);
    let discount = coupon_discount.min(subtotal).max(Money::ZERO);
    let shipping_fee = if subtotal >= shipping.free_threshold {
      Money::ZERO
    } else {
      shipping.fee
    };
    OrderTotals {
      subtotal,
      discount,
      shipping: shipping_fee,
      tax: Money::ZERO,
      total: subtotal - discount + shipping_fee,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn money_display() {
    assert_eq!(Money::from_paise(94_800).to_string(), "₹948.00");
    assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
    assert_eq!(Money::from_paise(-250).to_string(), "-₹2.50");
  }

  #[test]
  fn discount_price_only_applies_when_lower() {
    let price = Money::from_rupees(999);
    assert_eq!(effective_unit_price(price, Some(Money::from_rupees(799))), Money::from_rupees(799));
    assert_eq!(effective_unit_price(price, Some(Money::from_rupees(1299))), price);
    assert_eq!(effective_unit_price(price, None), price);
  }
}
