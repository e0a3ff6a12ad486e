// hopz/src/marketing.rs

//! Flash sales, storefront popups and contact-form enquiries.

use crate::coupon::{validate_value, DiscountKind};
use crate::error::RuleViolation;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Carts untouched by an order for this long count as abandoned.
pub const ABANDONED_AFTER_HOURS: i64 = 24;

pub fn abandoned_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
  now - Duration::hours(ABANDONED_AFTER_HOURS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashSaleWindow {
  pub discount_type: DiscountKind,
  pub discount_value: i64,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  pub is_active: bool,
}

impl FlashSaleWindow {
  pub fn validate(&self) -> Result<(), RuleViolation> {
    validate_value(self.discount_type, self.discount_value)
      .map_err(|_| RuleViolation::InvalidCampaign("discount value is out of range".into()))?;
    if self.ends_at <= self.starts_at {
      return Err(RuleViolation::InvalidCampaign("flash sale must end after it starts".into()));
    }
    Ok(())
  }

  /// Both ends of the window are inclusive.
  pub fn is_live(&self, now: DateTime<Utc>) -> bool {
    self.is_active && self.starts_at <= now && now <= self.ends_at
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "popup_kind", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PopupKind {
  Newsletter,
  Sale,
  Announcement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "contact_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum ContactStatus {
  Unread,
  Read,
  Replied,
}

impl ContactStatus {
  pub const ALL: [ContactStatus; 3] = [ContactStatus::Unread, ContactStatus::Read, ContactStatus::Replied];

  pub fn as_str(&self) -> &'static str {
    match self {
      ContactStatus::Unread => "UNREAD",
      ContactStatus::Read => "READ",
      ContactStatus::Replied => "REPLIED",
    }
  }
}

impl FromStr for ContactStatus {
  type Err = RuleViolation;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_uppercase();
    ContactStatus::ALL
      .into_iter()
      .find(|st| st.as_str() == wanted)
      .ok_or_else(|| RuleViolation::UnknownVariant {
        kind: "contact status",
        value: s.to_string(),
      })
  }
}

/// A contact-form submission before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub message: String,
}

impl ContactDraft {
  /// Every field is required; whitespace-only counts as missing.
  pub fn validate(&self) -> Result<(), RuleViolation> {
    let fields = [&self.name, &self.email, &self.subject, &self.message];
    if fields.iter().any(|f| f.trim().is_empty()) {
      return Err(RuleViolation::InvalidContact("All fields are required".into()));
    }
    if !self.email.contains('@') {
      return Err(RuleViolation::InvalidContact("email address is not valid".into()));
    }
    Ok(())
  }
}
