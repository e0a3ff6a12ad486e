// hopz-server/src/models/notification.rs

use chrono::{DateTime, Utc};
use hopz::notify::{NotificationKind, Priority};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
  pub id: Uuid,
  pub user_id: Option<Uuid>,
  pub is_admin: bool,
  pub title: String,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub priority: Priority,
  pub is_read: bool,
  pub metadata: Option<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}
