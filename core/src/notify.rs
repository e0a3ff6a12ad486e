// hopz/src/notify.rs

//! Notification drafts. The server persists them and, for alert-worthy admin
//! drafts, hands them to the mailer.

use crate::lifecycle::order::OrderStatus;
use crate::lifecycle::returns::{ReturnStatus, ReturnType};
use crate::pricing::Money;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "notification_kind", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum NotificationKind {
  Order,
  Security,
  System,
  Payment,
  OrderStatus,
  Query,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "notification_priority", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum Priority {
  Low,
  #[default]
  Normal,
  High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "snake_case")]
pub enum Audience {
  User(Uuid),
  Admins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
  pub audience: Audience,
  pub title: String,
  pub message: String,
  pub kind: NotificationKind,
  pub priority: Priority,
  pub metadata: Option<Value>,
}

fn short_ref(order_ref: &str) -> &str {
  match order_ref.char_indices().nth(8) {
    Some((idx, _)) if !order_ref.starts_with("HHZ-") => &order_ref[..idx],
    _ => order_ref,
  }
}

impl Draft {
  pub fn new(audience: Audience, kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
    Draft {
      audience,
      title: title.into(),
      message: message.into(),
      kind,
      priority: Priority::Normal,
      metadata: None,
    }
  }

  pub fn with_priority(mut self, priority: Priority) -> Self {
    self.priority = priority;
    self
  }

  pub fn with_metadata(mut self, metadata: Value) -> Self {
    self.metadata = Some(metadata);
    self
  }

  pub fn new_order(order_ref: &str, customer_name: &str, total: Money) -> Self {
    Draft::new(
      Audience::Admins,
      NotificationKind::Order,
      "New Order Received!",
      format!("Order #{} placed by {customer_name} for {total}.", short_ref(order_ref)),
    )
    .with_priority(Priority::High)
    .with_metadata(json!({ "order_id": order_ref }))
  }

  pub fn order_cancelled(order_ref: &str, reason: &str) -> Self {
    Draft::new(
      Audience::Admins,
      NotificationKind::Order,
      "Order Cancelled",
      format!("Order #{} has been cancelled. Reason: {reason}", short_ref(order_ref)),
    )
    .with_priority(Priority::High)
    .with_metadata(json!({ "order_id": order_ref }))
  }

  pub fn order_status(user_id: Uuid, order_ref: &str, status: OrderStatus) -> Self {
    Draft::new(
      Audience::User(user_id),
      NotificationKind::OrderStatus,
      format!("Order Update: {status}"),
      format!("Your order #{} is now {}.", short_ref(order_ref), status.label()),
    )
    .with_metadata(json!({ "order_id": order_ref, "status": status }))
  }

  pub fn new_signup(user_id: Uuid, email: &str) -> Self {
    Draft::new(
      Audience::Admins,
      NotificationKind::Security,
      "New User Signup",
      format!("A new account was created for {email}."),
    )
    .with_metadata(json!({ "user_id": user_id, "email": email }))
  }

  pub fn login(user_id: Uuid, email: &str) -> Self {
    Draft::new(
      Audience::Admins,
      NotificationKind::Security,
      "User Login",
      format!("{email} signed in."),
    )
    .with_priority(Priority::Low)
    .with_metadata(json!({ "user_id": user_id, "email": email }))
  }

  pub fn return_requested(order_ref: &str, kind: ReturnType, customer: &str) -> Self {
    let noun = match kind {
      ReturnType::Return => "return",
      ReturnType::Exchange => "exchange",
    };
    Draft::new(
      Audience::Admins,
      NotificationKind::Order,
      "New Return Request",
      format!("{customer} requested a {noun} for order #{}.", short_ref(order_ref)),
    )
    .with_metadata(json!({ "order_id": order_ref, "type": kind }))
  }

  pub fn return_decision(user_id: Uuid, order_ref: &str, status: ReturnStatus, note: Option<&str>) -> Self {
    let mut message = format!("Your return request for order #{} has been {status}.", short_ref(order_ref));
    if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
      message.push(' ');
      message.push_str(note.trim());
    }
    Draft::new(
      Audience::User(user_id),
      NotificationKind::OrderStatus,
      format!("Return Update: {}", status.as_str()),
      message,
    )
    .with_metadata(json!({ "order_id": order_ref, "return_status": status }))
  }

  pub fn contact_received(contact_id: Uuid, name: &str, subject: &str) -> Self {
    Draft::new(
      Audience::Admins,
      NotificationKind::Query,
      "New Customer Query",
      format!("{name} wrote in: {subject}"),
    )
    .with_metadata(json!({ "contact_id": contact_id }))
  }

  /// Admin order drafts of normal or high priority also go out by mail.
  pub fn should_alert_admin(&self) -> bool {
    self.audience == Audience::Admins
      && self.kind == NotificationKind::Order
      && matches!(self.priority, Priority::Normal | Priority::High)
  }

  pub fn user_id(&self) -> Option<Uuid> {
    match self.audience {
      Audience::User(id) => Some(id),
      Audience::Admins => None,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.audience == Audience::Admins
  }
}
