// hopz/src/lifecycle/order.rs

//! Order status workflow. Every surface that moves an order (customer cancel,
//! admin status update, payment confirmation) asks this module first.

use crate::error::RuleViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum OrderStatus {
  /// Placed with online payment, waiting for the gateway confirmation.
  Pending,
  Confirmed,
  Shipped,
  OutForDelivery,
  Delivered,
  Cancelled,
  Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PaymentMethod {
  Cod,
  Online,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
  ];

  pub fn initial_for(method: PaymentMethod) -> Self {
    match method {
      PaymentMethod::Cod => OrderStatus::Confirmed,
      PaymentMethod::Online => OrderStatus::Pending,
    }
  }

  /// Position along the delivery track. Terminal states are off the track.
  pub fn rank(self) -> Option<u8> {
    match self {
      OrderStatus::Pending => Some(0),
      OrderStatus::Confirmed => Some(1),
      OrderStatus::Shipped => Some(2),
      OrderStatus::OutForDelivery => Some(3),
      OrderStatus::Delivered => Some(4),
      OrderStatus::Cancelled | OrderStatus::Refunded => None,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Confirmed => "CONFIRMED",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
      OrderStatus::Refunded => "REFUNDED",
    }
  }

  /// Customer-facing wording used in notifications.
  pub fn label(self) -> &'static str {
    match self {
      OrderStatus::Pending => "awaiting payment",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Shipped => "shipped",
      OrderStatus::OutForDelivery => "out for delivery",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Refunded => "refunded",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = RuleViolation;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_uppercase();
    OrderStatus::ALL
      .into_iter()
      .find(|st| st.as_str() == wanted)
      .ok_or_else(|| RuleViolation::UnknownVariant {
        kind: "order status",
        value: s.to_string(),
      })
  }
}

impl PaymentMethod {
  /// Maps client labels onto the two settlement paths. CARD, UPI and
  /// NETBANKING all settle through the gateway.
  pub fn parse_label(label: &str) -> Result<Self, RuleViolation> {
    match label.trim().to_ascii_uppercase().as_str() {
      "COD" | "CASH_ON_DELIVERY" => Ok(PaymentMethod::Cod),
      "ONLINE" | "CARD" | "UPI" | "NETBANKING" | "RAZORPAY" => Ok(PaymentMethod::Online),
      _ => Err(RuleViolation::UnknownVariant {
        kind: "payment method",
        value: label.to_string(),
      }),
    }
  }
}

/// Outcome of a requested status change that passed the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Target equals the current status; nothing to write.
  Unchanged,
  Advance { from: OrderStatus, to: OrderStatus },
}

pub fn plan_transition(from: OrderStatus, to: OrderStatus) -> Result<Transition, RuleViolation> {
  if from == to {
    return Ok(Transition::Unchanged);
  }
  let illegal = RuleViolation::IllegalTransition { from, to };
  if from.is_terminal() || to == OrderStatus::Pending {
    return Err(illegal);
  }
  match (from.rank(), to.rank()) {
    (Some(a), Some(b)) if b < a => Err(illegal),
    _ if from == OrderStatus::Delivered && to == OrderStatus::Cancelled => Err(illegal),
    _ => Ok(Transition::Advance { from, to }),
  }
}

/// Customers may only cancel before the parcel leaves the warehouse.
pub fn ensure_customer_cancellable(status: OrderStatus) -> Result<(), RuleViolation> {
  match status {
    OrderStatus::Pending | OrderStatus::Confirmed => Ok(()),
    status => Err(RuleViolation::NotCancellable { status }),
  }
}

pub fn payment_status_after_cancel(method: PaymentMethod, current: PaymentStatus) -> PaymentStatus {
  match (method, current) {
    (PaymentMethod::Online, PaymentStatus::Completed) => PaymentStatus::Refunded,
    (_, other) => other,
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
  pub status: OrderStatus,
  pub updated_at: DateTime<Utc>,
  /// User id of the actor, or `SYSTEM`.
  pub updated_by: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Append-only log of status changes for one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusHistory(Vec<StatusHistoryEntry>);

impl StatusHistory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(
    &mut self,
    status: OrderStatus,
    updated_by: impl Into<String>,
    notes: Option<String>,
    at: DateTime<Utc>,
  ) -> &StatusHistoryEntry {
    self.0.push(StatusHistoryEntry {
      status,
      updated_at: at,
      updated_by: updated_by.into(),
      notes,
    });
    &self.0[self.0.len() - 1]
  }

  pub fn entries(&self) -> &[StatusHistoryEntry] {
    &self.0
  }

  pub fn latest(&self) -> Option<&StatusHistoryEntry> {
    self.0.last()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<Vec<StatusHistoryEntry>> for StatusHistory {
  fn from(entries: Vec<StatusHistoryEntry>) -> Self {
    StatusHistory(entries)
  }
}

/// Keeps the last ten digits, dropping country codes and punctuation.
pub fn normalize_phone(raw: &str) -> String {
  let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
  let start = digits.len().saturating_sub(10);
  digits[start..].iter().collect()
}

pub fn phones_match(a: &str, b: &str) -> bool {
  let (a, b) = (normalize_phone(a), normalize_phone(b));
  !a.is_empty() && a == b
}

pub mod order_number {
  use chrono::NaiveDate;
  use rand_core::{OsRng, RngCore};

  pub const PREFIX: &str = "HHZ";
  const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
  const SUFFIX_LEN: usize = 4;

  /// `HHZ-YYYYMMDD-XXXX`, the suffix drawn from `0-9A-Z`.
  pub fn generate(date: NaiveDate) -> String {
    let mut rng = OsRng;
    let suffix: String = (0..SUFFIX_LEN)
      .map(|_| ALPHABET[(rng.next_u32() % ALPHABET.len() as u32) as usize] as char)
      .collect();
    format!("{PREFIX}-{}-{suffix}", date.format("%Y%m%d"))
  }

  pub fn looks_like(candidate: &str) -> bool {
    let parts: Vec<&str> = candidate.split('-').collect();
    matches!(parts.as_slice(), [p, d, s]
      if *p == PREFIX
        && d.len() == 8
        && d.bytes().all(|b| b.is_ascii_digit())
        && s.len() == SUFFIX_LEN
        && s.bytes().all(|b| ALPHABET.contains(&b)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phone_normalisation_drops_country_code() {
    assert_eq!(normalize_phone("+91 98765-43210"), "9876543210");
    assert!(phones_match("919876543210", "98765 43210"));
    assert!(!phones_match("", ""));
  }

  #[test]
  fn order_numbers_have_the_expected_shape() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    let n = order_number::generate(date);
    assert!(n.starts_with("HHZ-20240309-"));
    assert!(order_number::looks_like(&n));
    assert!(!order_number::looks_like("HHZ-2024-ABCD"));
  }

  #[test]
  fn payment_method_labels() {
    assert_eq!(PaymentMethod::parse_label("upi").unwrap(), PaymentMethod::Online);
    assert_eq!(PaymentMethod::parse_label("COD").unwrap(), PaymentMethod::Cod);
    assert!(PaymentMethod::parse_label("barter").is_err());
  }
}
