// hopz/src/lib.rs

//! Hopz: the rules behind the Happy Hopz storefront.
//!
//!  - `lifecycle`: order and return state machines, the single authority on
//!    which status moves are legal.
//!  - `pricing`, `coupon`, `inventory`, `cart`, `review`: pure business rules.
//!  - `marketing`: flash-sale windows, popups and contact enquiries.
//!  - `notify`: notification drafts raised by lifecycle events.
//!  - `flow`: a small async step-pipeline engine (named steps with
//!    before/on/after hooks and a type-keyed registry) that the server uses to
//!    sequence each multi-step operation.

pub mod cart;
pub mod coupon;
pub mod error;
pub mod flow;
pub mod inventory;
pub mod lifecycle;
pub mod marketing;
pub mod notify;
pub mod pricing;
pub mod review;

pub use crate::error::{FlowError, FlowResult, RuleViolation};
pub use crate::flow::{ContextData, Flows, Pipeline, PipelineControl, PipelineResult};
pub use crate::lifecycle::order::{OrderStatus, PaymentMethod, PaymentStatus};
pub use crate::lifecycle::returns::{ReturnAction, ReturnStatus, ReturnType};
pub use crate::pricing::Money;
