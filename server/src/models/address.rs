// hopz-server/src/models/address.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
}

/// Copy of an address frozen onto an order or return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
  pub name: String,
  pub phone: String,
  pub line1: String,
  #[serde(default)]
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub pincode: String,
}

impl From<&Address> for AddressSnapshot {
  fn from(a: &Address) -> Self {
    AddressSnapshot {
      name: a.name.clone(),
      phone: a.phone.clone(),
      line1: a.line1.clone(),
      line2: a.line2.clone(),
      city: a.city.clone(),
      state: a.state.clone(),
      pincode: a.pincode.clone(),
    }
  }
}

impl AddressSnapshot {
  pub fn validate(&self) -> Result<(), String> {
    let required = [
      ("name", &self.name),
      ("phone", &self.phone),
      ("line1", &self.line1),
      ("city", &self.city),
      ("state", &self.state),
      ("pincode", &self.pincode),
    ];
    match required.iter().find(|(_, v)| v.trim().is_empty()) {
      Some((field, _)) => Err(format!("Address {field} is required")),
      None => Ok(()),
    }
  }
}
