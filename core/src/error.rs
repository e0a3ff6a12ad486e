// hopz/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::lifecycle::order::OrderStatus;
use crate::lifecycle::returns::{ReturnAction, ReturnStatus};

/// Failures raised by the step-pipeline engine itself, as opposed to the
/// business handlers it runs.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Step already defined: {step_name}")]
  DuplicateStep { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("Context type mismatch (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Error in step handler. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;

/// A business rule refused the requested operation.
///
/// These are caller mistakes (HTTP 4xx), never infrastructure faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
  #[error("Order cannot move from '{from}' to '{to}'")]
  IllegalTransition { from: OrderStatus, to: OrderStatus },

  #[error("Order cannot be cancelled in '{status}' status")]
  NotCancellable { status: OrderStatus },

  #[error("Only {expected} requests can be {action}")]
  ReturnNotInState {
    action: ReturnAction,
    expected: ReturnStatus,
    actual: ReturnStatus,
  },

  #[error("Only delivered orders can be returned")]
  OrderNotDelivered { status: OrderStatus },

  #[error("Return window has expired ({window_days} days from delivery)")]
  ReturnWindowExpired { window_days: i64 },

  #[error("A return request already exists for this order")]
  OpenReturnExists,

  #[error("At least one item must be selected")]
  NoItemsSelected,

  #[error("Order item {0} not found")]
  UnknownOrderItem(uuid::Uuid),

  #[error("Order item {0} was selected more than once")]
  DuplicateOrderItem(uuid::Uuid),

  #[error("Invalid quantity for item {name}")]
  InvalidReturnQuantity { name: String },

  #[error("Invalid or inactive coupon")]
  CouponInactive,

  #[error("Coupon has expired")]
  CouponExpired,

  #[error("Coupon usage limit reached")]
  CouponExhausted,

  #[error("Minimum order value of {minimum} required")]
  BelowMinimumOrder { minimum: crate::pricing::Money },

  #[error("Invalid coupon: {0}")]
  InvalidCoupon(String),

  #[error("Invalid review: {0}")]
  InvalidReview(String),

  #[error("Invalid campaign: {0}")]
  InvalidCampaign(String),

  #[error("{0}")]
  InvalidContact(String),

  #[error("Unknown {kind} value '{value}'")]
  UnknownVariant { kind: &'static str, value: String },
}

impl RuleViolation {
  /// Whether the violation describes a clash with existing state rather than a bad request.
  pub fn is_conflict(&self) -> bool {
    matches!(self, RuleViolation::OpenReturnExists)
  }

  /// Whether the violation means the referenced thing does not exist or is not usable at all.
  pub fn is_not_found(&self) -> bool {
    matches!(self, RuleViolation::CouponInactive)
  }
}
