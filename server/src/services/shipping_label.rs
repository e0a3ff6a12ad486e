// hopz-server/src/services/shipping_label.rs

//! Printable plain-text shipping labels for the packing desk.

use crate::models::{Order, OrderItem};
use hopz::PaymentMethod;
use std::fmt::Write;

pub const SENDER_BLOCK: [&str; 3] = ["Happy Hopz", "Kids Footwear Warehouse", "Bengaluru, Karnataka 560001"];

pub fn file_name(order: &Order) -> String {
  format!("shipping_label_{}.txt", order.order_number)
}

/// Renders the label. COD orders carry the amount to collect on delivery.
pub fn render(order: &Order, items: &[OrderItem]) -> String {
  let address = &order.address.0;
  let mut out = String::new();
  // Writing into a String cannot fail.
  let _ = writeln!(out, "ORDER {}", order.order_number);
  let _ = writeln!(out, "Placed {}", order.created_at.format("%d %b %Y"));
  out.push('\n');

  out.push_str("FROM\n");
  for line in SENDER_BLOCK {
    let _ = writeln!(out, "  {line}");
  }
  out.push('\n');

  out.push_str("SHIP TO\n");
  let _ = writeln!(out, "  {}", address.name);
  let _ = writeln!(out, "  {}", address.line1);
  if let Some(line2) = address.line2.as_deref().filter(|l| !l.trim().is_empty()) {
    let _ = writeln!(out, "  {line2}");
  }
  let _ = writeln!(out, "  {}, {} {}", address.city, address.state, address.pincode);
  let _ = writeln!(out, "  Phone: {}", address.phone);
  out.push('\n');

  out.push_str("CONTENTS\n");
  for item in items {
    let _ = writeln!(out, "  {} x {} ({} / {})", item.quantity, item.name, item.size, item.color);
  }
  out.push('\n');

  match order.payment_method {
    PaymentMethod::Cod => {
      let _ = writeln!(out, "CASH ON DELIVERY: collect {}", order.total);
    }
    PaymentMethod::Online => out.push_str("PREPAID\n"),
  }
  if let Some(tracking) = &order.tracking_number {
    let courier = order.courier_partner.as_deref().unwrap_or("Courier");
    let _ = writeln!(out, "{courier} AWB {tracking}");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::AddressSnapshot;
  use chrono::Utc;
  use hopz::lifecycle::order::StatusHistory;
  use hopz::pricing::Money;
  use hopz::{OrderStatus, PaymentStatus};
  use sqlx::types::Json;
  use uuid::Uuid;

  fn order(payment_method: PaymentMethod) -> Order {
    Order {
      id: Uuid::new_v4(),
      order_number: "HHZ-20240501-AB12".into(),
      user_id: None,
      guest_email: Some("guest@hopz.in".into()),
      guest_name: Some("Kavya".into()),
      guest_phone: None,
      address: Json(AddressSnapshot {
        name: "Kavya Rao".into(),
        phone: "9876543210".into(),
        line1: "12 MG Road".into(),
        line2: None,
        city: "Mysuru".into(),
        state: "Karnataka".into(),
        pincode: "570001".into(),
      }),
      status: OrderStatus::Confirmed,
      payment_method,
      payment_status: PaymentStatus::Pending,
      subtotal: Money::from_rupees(999),
      discount: Money::ZERO,
      shipping: Money::ZERO,
      tax: Money::ZERO,
      total: Money::from_rupees(999),
      coupon_code: None,
      status_history: Json(StatusHistory::new()),
      tracking_number: Some("DL123".into()),
      courier_partner: None,
      estimated_delivery: None,
      delivered_at: None,
      gateway_order_id: None,
      transaction_id: None,
      cancellation_reason: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn item(order_id: Uuid) -> OrderItem {
    OrderItem {
      id: Uuid::new_v4(),
      order_id,
      product_id: Uuid::new_v4(),
      name: "Bunny Hop Sneakers".into(),
      price: Money::from_rupees(999),
      quantity: 1,
      size: "7C".into(),
      color: "Pink".into(),
    }
  }

  #[test]
  fn cod_label_shows_amount_to_collect() {
    let o = order(PaymentMethod::Cod);
    let label = render(&o, &[item(o.id)]);
    assert!(label.contains("ORDER HHZ-20240501-AB12"));
    assert!(label.contains("Mysuru, Karnataka 570001"));
    assert!(label.contains("1 x Bunny Hop Sneakers (7C / Pink)"));
    assert!(label.contains("CASH ON DELIVERY: collect ₹999.00"));
    assert!(label.contains("Courier AWB DL123"));
    assert_eq!(file_name(&o), "shipping_label_HHZ-20240501-AB12.txt");
  }

  #[test]
  fn prepaid_label_has_no_collection_line() {
    let o = order(PaymentMethod::Online);
    let label = render(&o, &[]);
    assert!(label.contains("PREPAID"));
    assert!(!label.contains("CASH ON DELIVERY"));
  }
}
