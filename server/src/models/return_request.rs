// hopz-server/src/models/return_request.rs

use crate::models::AddressSnapshot;
use chrono::{DateTime, Utc};
use hopz::lifecycle::returns::{RefundStatus, ReturnLine};
use hopz::pricing::Money;
use hopz::{ReturnStatus, ReturnType};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnRequest {
  pub id: Uuid,
  pub order_id: Uuid,
  pub user_id: Uuid,
  #[serde(rename = "type")]
  pub return_type: ReturnType,
  pub status: ReturnStatus,
  pub items: Json<Vec<ReturnLine>>,
  pub items_total: Money,
  pub pickup_charge: Money,
  pub refund_amount: Option<Money>,
  pub refund_status: Option<RefundStatus>,
  pub refund_method: Option<String>,
  pub comments: Option<String>,
  pub pickup_address: Json<AddressSnapshot>,
  pub pickup_scheduled: Option<DateTime<Utc>>,
  pub admin_notes: Option<String>,
  pub tracking_number: Option<String>,
  pub processed_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Admin listing row: the request plus who filed it and against which order.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnRequestRow {
  #[sqlx(flatten)]
  #[serde(flatten)]
  pub request: ReturnRequest,
  pub order_number: String,
  pub user_email: String,
  pub user_name: Option<String>,
}
