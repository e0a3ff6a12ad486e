// hopz-server/src/flows/mod.rs

//! Business operations that span several steps, one pipeline per operation.

use crate::errors::AppError;
use hopz::Flows;

pub mod common_steps;
pub mod contexts;

pub mod cancel_order_flow;
pub mod cancel_return_flow;
pub mod create_return_flow;
pub mod decide_return_flow;
pub mod order_status_flow;
pub mod place_order_flow;
pub mod signin_flow;
pub mod signup_flow;

/// Registers every flow. Called once while building `AppState`.
pub fn register_all_flows(flows: &Flows<AppError>) -> Result<(), AppError> {
  tracing::info!("Registering business flows...");

  signup_flow::register_signup_flow(flows)?;
  signin_flow::register_signin_flow(flows)?;
  place_order_flow::register_place_order_flow(flows)?;
  cancel_order_flow::register_cancel_order_flow(flows)?;
  order_status_flow::register_order_status_flow(flows)?;
  create_return_flow::register_create_return_flow(flows)?;
  decide_return_flow::register_decide_return_flow(flows)?;
  cancel_return_flow::register_cancel_return_flow(flows)?;

  tracing::info!(count = flows.len(), "All business flows registered.");
  Ok(())
}
