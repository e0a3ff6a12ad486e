// hopz-server/src/models/contact.rs

use chrono::{DateTime, Utc};
use hopz::marketing::ContactStatus;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactForm {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub subject: String,
  pub message: String,
  pub status: ContactStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
