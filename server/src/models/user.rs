// hopz-server/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  User,
  Staff,
  Admin,
}

impl Role {
  pub fn is_admin(self) -> bool {
    self == Role::Admin
  }

  pub fn is_staff(self) -> bool {
    matches!(self, Role::Admin | Role::Staff)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub name: Option<String>,
  pub phone: Option<String>,
  pub role: Role,
  pub is_verified: bool,
  pub email_notifications: bool,
  pub promo_notifications: bool,
  pub whatsapp_order_notifications: bool,
  pub whatsapp_promo_notifications: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The profile returned by the auth endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
  pub id: Uuid,
  pub email: String,
  pub name: Option<String>,
  pub phone: Option<String>,
  pub role: Role,
  pub is_verified: bool,
  pub email_notifications: bool,
  pub promo_notifications: bool,
  pub whatsapp_order_notifications: bool,
  pub whatsapp_promo_notifications: bool,
}

impl From<&User> for PublicUser {
  fn from(u: &User) -> Self {
    PublicUser {
      id: u.id,
      email: u.email.clone(),
      name: u.name.clone(),
      phone: u.phone.clone(),
      role: u.role,
      is_verified: u.is_verified,
      email_notifications: u.email_notifications,
      promo_notifications: u.promo_notifications,
      whatsapp_order_notifications: u.whatsapp_order_notifications,
      whatsapp_promo_notifications: u.whatsapp_promo_notifications,
    }
  }
}

impl User {
  pub fn display_name(&self) -> String {
    self
      .name
      .clone()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or_else(|| self.email.split('@').next().unwrap_or("Customer").to_string())
  }
}
