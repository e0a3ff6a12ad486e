// tests/returns_tests.rs
mod common;

use chrono::Duration;
use common::*;
use hopz::lifecycle::returns::{select_lines, ItemCondition, RequestedLine, ReturnEligibility};
use hopz::pricing::{items_total, RefundQuote, PICKUP_CHARGE};
use hopz::{Money, OrderStatus, ReturnAction, ReturnStatus, ReturnType, RuleViolation};
use uuid::Uuid;

fn request(order_item_id: Uuid, quantity: i32) -> RequestedLine {
  RequestedLine {
    order_item_id,
    quantity,
    reason: "Too small".to_string(),
    condition: ItemCondition::default(),
    images: vec![],
  }
}

#[test]
fn return_state_machine() {
  use ReturnAction::*;
  use ReturnStatus::*;

  assert_eq!(Pending.apply(Approve).unwrap(), Approved);
  assert_eq!(Pending.apply(Reject).unwrap(), Rejected);
  assert_eq!(Pending.apply(Cancel).unwrap(), Cancelled);
  assert_eq!(Approved.apply(Complete).unwrap(), Completed);

  assert!(Approved.apply(Cancel).is_err());
  assert!(Pending.apply(Complete).is_err());
  assert!(Approved.apply(Reject).is_err());
  for terminal in [Rejected, Completed, Cancelled] {
    for action in [Approve, Reject, Complete, Cancel] {
      assert!(terminal.apply(action).is_err());
    }
  }
}

#[test]
fn only_pending_and_approved_are_open() {
  let open: Vec<_> = ReturnStatus::ALL.into_iter().filter(|s| s.is_open()).collect();
  assert_eq!(open, vec![ReturnStatus::Pending, ReturnStatus::Approved]);
}

#[test]
fn eligibility_requires_delivery_within_window() {
  let delivered = at(2024, 6, 1);
  assert!(ReturnEligibility::check(OrderStatus::Delivered, Some(delivered), delivered + Duration::days(14), 14, false).is_ok());

  assert_eq!(
    ReturnEligibility::check(OrderStatus::Delivered, Some(delivered), delivered + Duration::days(15), 14, false),
    Err(RuleViolation::ReturnWindowExpired { window_days: 14 })
  );
  assert_eq!(
    ReturnEligibility::check(OrderStatus::Shipped, None, delivered, 14, false),
    Err(RuleViolation::OrderNotDelivered { status: OrderStatus::Shipped })
  );
  assert_eq!(
    ReturnEligibility::check(OrderStatus::Delivered, Some(delivered), delivered, 14, true),
    Err(RuleViolation::OpenReturnExists)
  );
}

#[test]
fn two_pairs_at_499_refund_948() {
  let lines = vec![order_line("Bunny Sneakers", 499, 2)];
  let selected = select_lines(&lines, &[request(lines[0].order_item_id, 2)]).unwrap();

  let total = items_total(&selected);
  assert_eq!(total, Money::from_rupees(998));

  let quote = RefundQuote::for_request(ReturnType::Return, total);
  assert_eq!(quote.pickup_charge, PICKUP_CHARGE);
  assert_eq!(quote.refund_amount, Some(Money::from_rupees(948)));
  assert!(quote.summary().contains("₹948.00"));
}

#[test]
fn exchange_has_no_refund() {
  let quote = RefundQuote::for_request(ReturnType::Exchange, Money::from_rupees(1299));
  assert_eq!(quote.refund_amount, None);
  assert_eq!(quote.pickup_charge, Money::ZERO);
  assert!(quote.summary().contains("free"));
}

#[test]
fn refund_never_goes_negative() {
  let quote = RefundQuote::for_request(ReturnType::Return, Money::from_rupees(30));
  assert_eq!(quote.refund_amount, Some(Money::ZERO));
}

#[test]
fn line_selection_validates_against_the_order() {
  let lines = vec![order_line("Sandal", 399, 1), order_line("Boot", 899, 2)];

  assert_eq!(select_lines(&lines, &[]), Err(RuleViolation::NoItemsSelected));

  let stranger = Uuid::new_v4();
  assert_eq!(
    select_lines(&lines, &[request(stranger, 1)]),
    Err(RuleViolation::UnknownOrderItem(stranger))
  );
  assert_eq!(
    select_lines(&lines, &[request(lines[0].order_item_id, 2)]),
    Err(RuleViolation::InvalidReturnQuantity { name: "Sandal".into() })
  );
  assert!(select_lines(&lines, &[request(lines[1].order_item_id, 0)]).is_err());
  assert_eq!(
    select_lines(&lines, &[request(lines[1].order_item_id, 1), request(lines[1].order_item_id, 1)]),
    Err(RuleViolation::DuplicateOrderItem(lines[1].order_item_id))
  );

  let picked = select_lines(&lines, &[request(lines[1].order_item_id, 1)]).unwrap();
  assert_eq!(picked.len(), 1);
  assert_eq!(picked[0].price, Money::from_rupees(899));
  assert_eq!(picked[0].size, "8C");
  assert_eq!(items_total(&picked), Money::from_rupees(899));
}
