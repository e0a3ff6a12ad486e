// hopz-server/src/flows/contexts.rs

//! Context data for every business flow. Handlers receive these wrapped in
//! `hopz::ContextData`; the web layer seeds the inputs and reads the outputs.

use crate::models::{AddressSnapshot, Coupon, Order, OrderItem, ReturnRequest, User};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use hopz::lifecycle::order::Transition;
use hopz::lifecycle::returns::{RequestedLine, ReturnLine};
use hopz::pricing::{Money, OrderTotals, Priced, RefundQuote};
use hopz::{OrderStatus, PaymentMethod, ReturnType};
use serde::Deserialize;
use uuid::Uuid;

/// Who is driving a flow, as established by the bearer token.
#[derive(Debug, Clone)]
pub struct Actor {
  pub user_id: Uuid,
  pub email: String,
  pub is_admin: bool,
}

impl Actor {
  pub fn history_label(&self) -> String {
    self.user_id.to_string()
  }
}

// --- Accounts ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub name: Option<String>,
  pub phone: Option<String>,
  pub created_user: Option<User>,
  pub token: Option<String>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub token: Option<String>,
}

// --- Orders ---

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineInput {
  pub product_id: Uuid,
  pub quantity: i32,
  pub size: String,
  #[serde(default)]
  pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderInput {
  pub items: Vec<OrderLineInput>,
  #[serde(default)]
  pub address_id: Option<Uuid>,
  #[serde(default)]
  pub address: Option<AddressSnapshot>,
  pub payment_method: String,
  #[serde(default)]
  pub coupon_code: Option<String>,
  #[serde(default)]
  pub guest_email: Option<String>,
  #[serde(default)]
  pub guest_name: Option<String>,
  #[serde(default)]
  pub guest_phone: Option<String>,
}

/// A requested line priced from the catalogue.
#[derive(Debug, Clone)]
pub struct PricedLine {
  pub product_id: Uuid,
  pub name: String,
  pub unit_price: Money,
  pub quantity: i32,
  pub size: String,
  pub color: String,
}

impl Priced for PricedLine {
  fn unit_price(&self) -> Money {
    self.unit_price
  }
  fn quantity(&self) -> i32 {
    self.quantity
  }
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub app_state: AppState,
  pub customer: Option<Actor>,
  pub input: PlaceOrderInput,
  pub payment_method: Option<PaymentMethod>,
  pub address: Option<AddressSnapshot>,
  pub lines: Vec<PricedLine>,
  pub coupon: Option<Coupon>,
  pub coupon_discount: Money,
  pub totals: Option<OrderTotals>,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
}

impl PlaceOrderCtxData {
  pub fn new(app_state: AppState, customer: Option<Actor>, input: PlaceOrderInput) -> Self {
    PlaceOrderCtxData {
      app_state,
      customer,
      input,
      payment_method: None,
      address: None,
      lines: Vec::new(),
      coupon: None,
      coupon_discount: Money::ZERO,
      totals: None,
      order: None,
      items: Vec::new(),
    }
  }
}

#[derive(Clone)]
pub struct CancelOrderCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub order_ref: String,
  pub reason: String,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
  pub updated: Option<Order>,
  pub refund_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateInput {
  pub status: String,
  #[serde(default)]
  pub tracking_number: Option<String>,
  #[serde(default)]
  pub courier_partner: Option<String>,
  #[serde(default)]
  pub estimated_delivery: Option<DateTime<Utc>>,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub order_ref: String,
  pub input: StatusUpdateInput,
  pub target: Option<OrderStatus>,
  pub order: Option<Order>,
  pub transition: Option<Transition>,
  pub updated: Option<Order>,
}

// --- Returns ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReturnInput {
  pub order_id: String,
  #[serde(rename = "type")]
  pub return_type: String,
  pub items: Vec<RequestedLine>,
  #[serde(default)]
  pub comments: Option<String>,
  #[serde(default)]
  pub pickup_address: Option<AddressSnapshot>,
}

#[derive(Clone)]
pub struct CreateReturnCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub input: CreateReturnInput,
  pub return_type: Option<ReturnType>,
  pub order: Option<Order>,
  pub lines: Vec<ReturnLine>,
  pub quote: Option<RefundQuote>,
  pub created: Option<ReturnRequest>,
}

/// What the admin decided, with the fields each decision carries.
#[derive(Debug, Clone)]
pub enum ReturnDecision {
  Approve {
    pickup_scheduled: Option<DateTime<Utc>>,
    admin_notes: Option<String>,
  },
  Reject {
    reason: String,
    admin_notes: Option<String>,
  },
  Complete {
    refund_method: Option<String>,
    tracking_number: Option<String>,
    admin_notes: Option<String>,
    restock_items: bool,
  },
}

impl ReturnDecision {
  pub fn action(&self) -> hopz::ReturnAction {
    match self {
      ReturnDecision::Approve { .. } => hopz::ReturnAction::Approve,
      ReturnDecision::Reject { .. } => hopz::ReturnAction::Reject,
      ReturnDecision::Complete { .. } => hopz::ReturnAction::Complete,
    }
  }
}

#[derive(Clone)]
pub struct DecideReturnCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub return_id: Uuid,
  pub decision: ReturnDecision,
  pub request: Option<ReturnRequest>,
  pub order_number: Option<String>,
  pub updated: Option<ReturnRequest>,
}

#[derive(Clone)]
pub struct CancelReturnCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub return_id: Uuid,
  pub request: Option<ReturnRequest>,
  pub updated: Option<ReturnRequest>,
}
