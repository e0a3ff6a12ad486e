// hopz-server/src/web/handlers/mod.rs

pub mod address_handlers;
pub mod admin_handlers;
pub mod admin_return_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod contact_handlers;
pub mod coupon_handlers;
pub mod health_handlers;
pub mod marketing_handlers;
pub mod notification_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod product_handlers;
pub mod return_handlers;
pub mod review_handlers;
pub mod search_handlers;
pub mod settings_handlers;

use crate::errors::Result as AppResult;
use crate::state::AppState;
use hopz::{ContextData, PipelineResult};

/// Runs the flow registered for `T` and hands back the final context.
pub(crate) async fn run_flow<T>(state: &AppState, data: T) -> AppResult<(PipelineResult, T)>
where
  T: Clone + Send + Sync + 'static,
{
  let ctx_data = ContextData::new(data);
  let outcome = state.flows.run(ctx_data.clone()).await?;
  Ok((outcome, ctx_data.into_inner()))
}

/// Trims and drops empty optional text fields.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Query-string filter: "all" and empty mean no filter.
pub(crate) fn filter_value(raw: Option<String>) -> Option<String> {
  clean(raw).filter(|v| !v.eq_ignore_ascii_case("all"))
}
