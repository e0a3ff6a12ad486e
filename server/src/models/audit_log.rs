// hopz-server/src/models/audit_log.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLog {
  pub id: Uuid,
  pub admin_id: Uuid,
  pub action: String,
  pub entity: String,
  pub entity_id: Option<String>,
  pub details: String,
  pub created_at: DateTime<Utc>,
}
