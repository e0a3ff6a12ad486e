// hopz/src/lifecycle/returns.rs

//! Return / exchange request workflow: eligibility, line selection and the
//! PENDING → APPROVED → COMPLETED state machine.

use crate::error::RuleViolation;
use crate::lifecycle::order::OrderStatus;
use crate::pricing::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "return_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum ReturnType {
  Return,
  Exchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "return_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum ReturnStatus {
  Pending,
  Approved,
  Rejected,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "refund_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum RefundStatus {
  Pending,
  Processed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCondition {
  #[default]
  Unused,
  Used,
  Damaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnAction {
  Approve,
  Reject,
  Complete,
  /// Customer withdrawal.
  Cancel,
}

impl ReturnType {
  pub fn parse(raw: &str) -> Result<Self, RuleViolation> {
    match raw.trim().to_ascii_uppercase().as_str() {
      "RETURN" => Ok(ReturnType::Return),
      "EXCHANGE" => Ok(ReturnType::Exchange),
      _ => Err(RuleViolation::UnknownVariant {
        kind: "return type",
        value: raw.to_string(),
      }),
    }
  }
}

impl ReturnStatus {
  pub const ALL: [ReturnStatus; 5] = [
    ReturnStatus::Pending,
    ReturnStatus::Approved,
    ReturnStatus::Rejected,
    ReturnStatus::Completed,
    ReturnStatus::Cancelled,
  ];

  /// An open request blocks a second request for the same order.
  pub fn is_open(self) -> bool {
    matches!(self, ReturnStatus::Pending | ReturnStatus::Approved)
  }

  pub fn apply(self, action: ReturnAction) -> Result<ReturnStatus, RuleViolation> {
    let expected = action.required_status();
    if self != expected {
      return Err(RuleViolation::ReturnNotInState {
        action,
        expected,
        actual: self,
      });
    }
    Ok(match action {
      ReturnAction::Approve => ReturnStatus::Approved,
      ReturnAction::Reject => ReturnStatus::Rejected,
      ReturnAction::Complete => ReturnStatus::Completed,
      ReturnAction::Cancel => ReturnStatus::Cancelled,
    })
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ReturnStatus::Pending => "PENDING",
      ReturnStatus::Approved => "APPROVED",
      ReturnStatus::Rejected => "REJECTED",
      ReturnStatus::Completed => "COMPLETED",
      ReturnStatus::Cancelled => "CANCELLED",
    }
  }

  pub fn parse(raw: &str) -> Result<Self, RuleViolation> {
    let wanted = raw.trim().to_ascii_uppercase();
    ReturnStatus::ALL
      .into_iter()
      .find(|s| s.as_str() == wanted)
      .ok_or_else(|| RuleViolation::UnknownVariant {
        kind: "return status",
        value: raw.to_string(),
      })
  }
}

impl fmt::Display for ReturnStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.as_str().to_ascii_lowercase())
  }
}

impl ReturnAction {
  pub fn required_status(self) -> ReturnStatus {
    match self {
      ReturnAction::Complete => ReturnStatus::Approved,
      ReturnAction::Approve | ReturnAction::Reject | ReturnAction::Cancel => ReturnStatus::Pending,
    }
  }
}

impl fmt::Display for ReturnAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ReturnAction::Approve => "approved",
      ReturnAction::Reject => "rejected",
      ReturnAction::Complete => "completed",
      ReturnAction::Cancel => "cancelled",
    })
  }
}

/// Gate for opening a new return or exchange request.
pub struct ReturnEligibility;

impl ReturnEligibility {
  pub fn check(
    order_status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window_days: i64,
    has_open_request: bool,
  ) -> Result<(), RuleViolation> {
    if order_status != OrderStatus::Delivered {
      return Err(RuleViolation::OrderNotDelivered { status: order_status });
    }
    // Orders delivered before delivery stamping existed count from now.
    let delivered_at = delivered_at.unwrap_or(now);
    let elapsed_days = (now - delivered_at).num_days();
    if elapsed_days > window_days {
      return Err(RuleViolation::ReturnWindowExpired { window_days });
    }
    if has_open_request {
      return Err(RuleViolation::OpenReturnExists);
    }
    Ok(())
  }
}

/// A purchased line as recorded on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
  pub order_item_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  pub price: Money,
  pub quantity: i32,
  pub size: String,
  pub color: String,
}

/// What the customer asked to send back for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestedLine {
  pub order_item_id: Uuid,
  pub quantity: i32,
  pub reason: String,
  #[serde(default)]
  pub condition: ItemCondition,
  #[serde(default)]
  pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
  pub order_item_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  pub price: Money,
  pub quantity: i32,
  pub size: String,
  pub color: String,
  pub reason: String,
  pub condition: ItemCondition,
  #[serde(default)]
  pub images: Vec<String>,
}

/// Resolves each requested line against the order, snapshotting price and variant.
pub fn select_lines(order_lines: &[OrderLine], requested: &[RequestedLine]) -> Result<Vec<ReturnLine>, RuleViolation> {
  if requested.is_empty() {
    return Err(RuleViolation::NoItemsSelected);
  }

  let mut seen = HashSet::with_capacity(requested.len());
  requested
    .iter()
    .map(|req| {
      if !seen.insert(req.order_item_id) {
        return Err(RuleViolation::DuplicateOrderItem(req.order_item_id));
      }
      let line = order_lines
        .iter()
        .find(|l| l.order_item_id == req.order_item_id)
        .ok_or(RuleViolation::UnknownOrderItem(req.order_item_id))?;
      if req.quantity < 1 || req.quantity > line.quantity {
        return Err(RuleViolation::InvalidReturnQuantity { name: line.name.clone() });
      }
      Ok(ReturnLine {
        order_item_id: line.order_item_id,
        product_id: line.product_id,
        name: line.name.clone(),
        price: line.price,
        quantity: req.quantity,
        size: line.size.clone(),
        color: line.color.clone(),
        reason: req.reason.trim().to_string(),
        condition: req.condition,
        images: req.images.clone(),
      })
    })
    .collect()
}
