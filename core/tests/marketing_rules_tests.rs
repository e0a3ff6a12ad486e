// tests/marketing_rules_tests.rs
mod common;

use chrono::Duration;
use common::*;
use hopz::coupon::DiscountKind;
use hopz::marketing::{abandoned_cutoff, ContactDraft, ContactStatus, FlashSaleWindow};
use hopz::notify::{Audience, Draft, NotificationKind};
use hopz::RuleViolation;
use uuid::Uuid;

fn sale(kind: DiscountKind, value: i64) -> FlashSaleWindow {
  let start = at(2024, 11, 1);
  FlashSaleWindow {
    discount_type: kind,
    discount_value: value,
    starts_at: start,
    ends_at: start + Duration::hours(48),
    is_active: true,
  }
}

#[test]
fn flash_sale_window_is_inclusive() {
  let s = sale(DiscountKind::Percentage, 20);
  assert!(s.is_live(s.starts_at));
  assert!(s.is_live(s.ends_at));
  assert!(!s.is_live(s.starts_at - Duration::seconds(1)));
  assert!(!s.is_live(s.ends_at + Duration::seconds(1)));
  assert!(!FlashSaleWindow { is_active: false, ..s.clone() }.is_live(s.starts_at));
}

#[test]
fn flash_sale_validation() {
  assert!(sale(DiscountKind::Flat, 5_000).validate().is_ok());
  assert!(matches!(
    sale(DiscountKind::Percentage, 0).validate(),
    Err(RuleViolation::InvalidCampaign(_))
  ));
  assert!(sale(DiscountKind::Percentage, 120).validate().is_err());

  let backwards = FlashSaleWindow {
    ends_at: at(2024, 10, 1),
    ..sale(DiscountKind::Flat, 100)
  };
  assert!(backwards.validate().is_err());
}

#[test]
fn contact_form_needs_every_field() {
  let draft = ContactDraft {
    name: "Meera".into(),
    email: "meera@hopz.in".into(),
    subject: "Sizing".into(),
    message: "Does 7C run small?".into(),
  };
  assert!(draft.validate().is_ok());
  assert_eq!(
    ContactDraft { subject: "  ".into(), ..draft.clone() }.validate(),
    Err(RuleViolation::InvalidContact("All fields are required".into()))
  );
  assert!(ContactDraft { email: "meera".into(), ..draft }.validate().is_err());
}

#[test]
fn contact_status_parses_loosely() {
  assert_eq!("replied".parse::<ContactStatus>().unwrap(), ContactStatus::Replied);
  assert_eq!(" READ ".parse::<ContactStatus>().unwrap(), ContactStatus::Read);
  assert!("ARCHIVED".parse::<ContactStatus>().is_err());
}

#[test]
fn abandoned_cutoff_is_a_day_back() {
  assert_eq!(abandoned_cutoff(at(2024, 5, 2)), at(2024, 5, 1));
}

#[test]
fn contact_drafts_reach_admins_without_mail() {
  let draft = Draft::contact_received(Uuid::new_v4(), "Meera", "Sizing");
  assert_eq!(draft.audience, Audience::Admins);
  assert_eq!(draft.kind, NotificationKind::Query);
  assert!(!draft.should_alert_admin());
}
