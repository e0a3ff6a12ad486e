// tests/pricing_rules_tests.rs
mod common;

use common::*;
use hopz::cart::{merge_guest_cart, CartLine, MAX_LINE_QUANTITY};
use hopz::coupon::{CouponRule, DiscountKind};
use hopz::inventory::Inventory;
use hopz::notify::{Audience, Draft, NotificationKind, Priority};
use hopz::pricing::{OrderTotals, ShippingPolicy};
use hopz::review::ReviewDraft;
use hopz::{Money, OrderStatus, RuleViolation};
use uuid::Uuid;

fn coupon(kind: DiscountKind, value: i64) -> CouponRule {
  CouponRule {
    code: "HOPZ10".into(),
    kind,
    value,
    min_order_value: None,
    expiry: None,
    max_uses: None,
    current_uses: 0,
    is_active: true,
  }
}

#[test]
fn percentage_and_flat_coupons() {
  let now = at(2024, 1, 1);
  let cart = Money::from_rupees(1000);
  assert_eq!(coupon(DiscountKind::Percentage, 10).evaluate(cart, now).unwrap(), Money::from_rupees(100));
  assert_eq!(coupon(DiscountKind::Flat, 15_000).evaluate(cart, now).unwrap(), Money::from_rupees(150));
  // capped at the cart total
  assert_eq!(coupon(DiscountKind::Flat, 500_000).evaluate(cart, now).unwrap(), cart);
}

#[test]
fn coupon_rule_failures() {
  let now = at(2024, 1, 1);
  let cart = Money::from_rupees(300);

  let mut c = coupon(DiscountKind::Percentage, 10);
  c.is_active = false;
  assert_eq!(c.evaluate(cart, now), Err(RuleViolation::CouponInactive));

  let mut c = coupon(DiscountKind::Percentage, 10);
  c.expiry = Some(at(2023, 12, 31));
  assert_eq!(c.evaluate(cart, now), Err(RuleViolation::CouponExpired));

  let mut c = coupon(DiscountKind::Percentage, 10);
  c.max_uses = Some(5);
  c.current_uses = 5;
  assert_eq!(c.evaluate(cart, now), Err(RuleViolation::CouponExhausted));

  let mut c = coupon(DiscountKind::Percentage, 10);
  c.min_order_value = Some(Money::from_rupees(499));
  let err = c.evaluate(cart, now).unwrap_err();
  assert_eq!(err.to_string(), "Minimum order value of ₹499.00 required");
}

#[test]
fn order_totals_apply_free_shipping_threshold() {
  let policy = ShippingPolicy {
    free_threshold: Money::from_rupees(499),
    fee: Money::from_rupees(49),
  };
  let lines = vec![(Money::from_rupees(499), 2)];
  let totals = OrderTotals::compute(&lines, Money::from_rupees(100), policy);
  assert_eq!(totals.subtotal, Money::from_rupees(998));
  assert_eq!(totals.shipping, Money::ZERO);
  assert_eq!(totals.tax, Money::ZERO);
  assert_eq!(totals.total, Money::from_rupees(898));

  let small = vec![(Money::from_rupees(299), 1)];
  let totals = OrderTotals::compute(&small, Money::ZERO, policy);
  assert_eq!(totals.total, Money::from_rupees(348));

  let totals = OrderTotals::compute(&small, Money::from_rupees(1000), policy);
  assert_eq!(totals.discount, Money::from_rupees(299));
}

#[test]
fn inventory_reserve_and_restock() {
  let mut inv = Inventory::default_for(&["6C", "7C"]);
  assert_eq!(inv.total(), 20);
  assert!(inv.reserve("6C", 3));
  assert_eq!(inv.stock_for("6C"), Some(7));
  assert!(inv.reserve("7C", 50));
  assert_eq!(inv.stock_for("7C"), Some(0));
  assert!(!inv.reserve("9C", 1));

  inv.restock("7C", 2);
  inv.restock("9C", 1);
  assert_eq!(inv.stock_for("7C"), Some(2));
  assert_eq!(inv.total(), 10);
}

#[test]
fn stock_take_overwrites_counts() {
  let mut inv = Inventory::default_for(&["6C"]);
  inv.set_stock("6C", 4);
  inv.set_stock("8C", -3);
  assert_eq!(inv.stock_for("6C"), Some(4));
  assert_eq!(inv.stock_for("8C"), Some(0));
  assert_eq!(inv.total(), 4);
}

#[test]
fn guest_cart_merge_sums_matching_variants() {
  let shoe = Uuid::new_v4();
  let line = |size: &str, qty| CartLine {
    product_id: shoe,
    size: size.into(),
    color: "Red".into(),
    quantity: qty,
  };
  let merged = merge_guest_cart(&[line("6C", 1)], &[line("6C", 2), line("7C", 1), line("8C", 0)]);
  assert_eq!(merged, vec![line("6C", 3), line("7C", 1)]);
}

#[test]
fn guest_cart_merge_caps_huge_quantities() {
  let shoe = Uuid::new_v4();
  let line = |size: &str, qty| CartLine {
    product_id: shoe,
    size: size.into(),
    color: "Blue".into(),
    quantity: qty,
  };
  let merged = merge_guest_cart(&[line("6C", i32::MAX)], &[line("6C", i32::MAX), line("7C", 500)]);
  assert_eq!(merged, vec![line("6C", MAX_LINE_QUANTITY), line("7C", MAX_LINE_QUANTITY)]);
}

#[test]
fn review_bounds() {
  let ok = ReviewDraft { rating: 5, comment: "Lovely fit".into(), recommend: true };
  assert!(ok.validate().is_ok());
  assert!(ReviewDraft { rating: 0, ..ok.clone() }.validate().is_err());
  assert!(ReviewDraft { rating: 6, ..ok.clone() }.validate().is_err());
  assert!(ReviewDraft { comment: "ok".into(), ..ok.clone() }.validate().is_err());
  assert!(ReviewDraft { comment: "x".repeat(501), ..ok }.validate().is_err());
}

#[test]
fn admin_order_drafts_trigger_alerts() {
  let draft = Draft::new_order("HHZ-20240501-AB12", "Asha", Money::from_rupees(998));
  assert_eq!(draft.audience, Audience::Admins);
  assert_eq!(draft.priority, Priority::High);
  assert!(draft.message.contains("HHZ-20240501-AB12"));
  assert!(draft.should_alert_admin());

  let login = Draft::login(Uuid::new_v4(), "a@b.in");
  assert!(!login.should_alert_admin());

  let user = Uuid::new_v4();
  let status = Draft::order_status(user, "HHZ-20240501-AB12", OrderStatus::OutForDelivery);
  assert_eq!(status.kind, NotificationKind::OrderStatus);
  assert_eq!(status.user_id(), Some(user));
  assert!(status.message.ends_with("is now out for delivery."));
  assert!(!status.should_alert_admin());
}
