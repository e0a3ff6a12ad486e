// tests/order_lifecycle_tests.rs
mod common;

use common::*;
use hopz::lifecycle::order::{
  ensure_customer_cancellable, payment_status_after_cancel, plan_transition, StatusHistory, Transition, SYSTEM_ACTOR,
};
use hopz::{OrderStatus, PaymentMethod, PaymentStatus, RuleViolation};

use OrderStatus::*;

#[test]
fn initial_status_depends_on_payment_method() {
  assert_eq!(OrderStatus::initial_for(PaymentMethod::Cod), Confirmed);
  assert_eq!(OrderStatus::initial_for(PaymentMethod::Online), Pending);
}

#[test]
fn forward_moves_are_allowed_including_skips() {
  assert_eq!(
    plan_transition(Confirmed, Shipped).unwrap(),
    Transition::Advance { from: Confirmed, to: Shipped }
  );
  assert!(plan_transition(Shipped, OutForDelivery).is_ok());
  assert!(plan_transition(OutForDelivery, Delivered).is_ok());
  assert!(plan_transition(Confirmed, Delivered).is_ok());
  assert!(plan_transition(Pending, Confirmed).is_ok());
}

#[test]
fn same_status_is_a_no_op() {
  for status in OrderStatus::ALL {
    assert_eq!(plan_transition(status, status).unwrap(), Transition::Unchanged);
  }
}

#[test]
fn status_never_moves_backward() {
  let track = [Pending, Confirmed, Shipped, OutForDelivery, Delivered];
  for (i, from) in track.iter().enumerate() {
    for to in &track[..i] {
      assert_eq!(
        plan_transition(*from, *to),
        Err(RuleViolation::IllegalTransition { from: *from, to: *to }),
        "{from} -> {to} should be refused"
      );
    }
  }
}

#[test]
fn cancelled_and_refunded_are_absorbing() {
  for from in [Cancelled, Refunded] {
    for to in OrderStatus::ALL.into_iter().filter(|s| *s != from) {
      assert!(plan_transition(from, to).is_err(), "{from} -> {to} should be refused");
    }
  }
}

#[test]
fn terminal_states_reachable_from_open_orders() {
  for from in [Pending, Confirmed, Shipped, OutForDelivery] {
    assert!(plan_transition(from, Cancelled).is_ok());
    assert!(plan_transition(from, Refunded).is_ok());
  }
  assert!(plan_transition(Delivered, Refunded).is_ok());
  assert!(plan_transition(Delivered, Cancelled).is_err());
}

#[test]
fn customer_cannot_cancel_a_shipped_order() {
  assert!(ensure_customer_cancellable(Pending).is_ok());
  assert!(ensure_customer_cancellable(Confirmed).is_ok());
  assert_eq!(
    ensure_customer_cancellable(Shipped),
    Err(RuleViolation::NotCancellable { status: Shipped })
  );
  for status in [OutForDelivery, Delivered, Cancelled, Refunded] {
    assert!(ensure_customer_cancellable(status).is_err());
  }
}

#[test]
fn paid_online_orders_are_refunded_on_cancel() {
  assert_eq!(
    payment_status_after_cancel(PaymentMethod::Online, PaymentStatus::Completed),
    PaymentStatus::Refunded
  );
  assert_eq!(
    payment_status_after_cancel(PaymentMethod::Online, PaymentStatus::Pending),
    PaymentStatus::Pending
  );
  assert_eq!(
    payment_status_after_cancel(PaymentMethod::Cod, PaymentStatus::Pending),
    PaymentStatus::Pending
  );
}

#[test]
fn status_history_appends() {
  let mut history = StatusHistory::new();
  history.record(Confirmed, SYSTEM_ACTOR, None, at(2024, 5, 1));
  history.record(Shipped, "admin-1", Some("Blue Dart AWB 123".into()), at(2024, 5, 2));

  assert_eq!(history.len(), 2);
  assert_eq!(history.entries()[0].status, Confirmed);
  let latest = history.latest().unwrap();
  assert_eq!(latest.status, Shipped);
  assert_eq!(latest.notes.as_deref(), Some("Blue Dart AWB 123"));

  let json = serde_json::to_value(&history).unwrap();
  assert_eq!(json[1]["status"], "SHIPPED");
  assert!(json[0].get("notes").is_none());
}

#[test]
fn statuses_parse_from_wire_names() {
  assert_eq!("out_for_delivery".parse::<OrderStatus>().unwrap(), OutForDelivery);
  assert_eq!(serde_json::to_string(&OutForDelivery).unwrap(), "\"OUT_FOR_DELIVERY\"");
  assert!("LOST".parse::<OrderStatus>().is_err());
}
