// hopz-server/src/models/order.rs

use crate::models::{AddressSnapshot, OrderItem};
use chrono::{DateTime, Utc};
use hopz::lifecycle::order::StatusHistory;
use hopz::pricing::Money;
use hopz::{OrderStatus, PaymentMethod, PaymentStatus};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Option<Uuid>,
  pub guest_email: Option<String>,
  pub guest_name: Option<String>,
  pub guest_phone: Option<String>,
  pub address: Json<AddressSnapshot>,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub subtotal: Money,
  pub discount: Money,
  pub shipping: Money,
  pub tax: Money,
  pub total: Money,
  pub coupon_code: Option<String>,
  pub status_history: Json<StatusHistory>,
  pub tracking_number: Option<String>,
  pub courier_partner: Option<String>,
  pub estimated_delivery: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub gateway_order_id: Option<String>,
  pub transaction_id: Option<String>,
  pub cancellation_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Name used in admin notifications.
  pub fn customer_label(&self, account_name: Option<&str>) -> String {
    account_name
      .map(str::to_string)
      .or_else(|| self.guest_name.clone())
      .unwrap_or_else(|| self.address.name.clone())
  }
}

/// An order with its lines, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItem>,
}
