// hopz-server/src/flows/cancel_return_flow.rs
use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps;
use crate::flows::contexts::CancelReturnCtxData;
use crate::models::ReturnRequest;
use hopz::{ContextData, FlowError, Flows, Pipeline, PipelineControl, ReturnAction};
use tracing::info;

pub fn register_cancel_return_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<CancelReturnCtxData, AppError>::new(
    "cancel_return",
    &[("load_request", false), ("withdraw_request", false)],
  );

  p.on("load_request", load_request)?;
  p.on("withdraw_request", withdraw_request)?;

  flows.register(p);
  info!("Cancel-return flow registered.");
  Ok(())
}

async fn load_request(ctx_data: ContextData<CancelReturnCtxData>) -> AppResult<PipelineControl> {
  let (return_id, actor, pool) = ctx_data.with(|c| (c.return_id, c.actor.clone(), c.app_state.db_pool.clone()));
  let request = common_steps::load_return_request(&pool, return_id).await?;
  if request.user_id != actor.user_id {
    return Err(AppError::Forbidden("Not authorized to cancel this request".to_string()));
  }
  ctx_data.write().request = Some(request);
  Ok(PipelineControl::Continue)
}

async fn withdraw_request(ctx_data: ContextData<CancelReturnCtxData>) -> AppResult<PipelineControl> {
  let (request, pool) = ctx_data.with(|c| (c.request.clone(), c.app_state.db_pool.clone()));
  let request = request.ok_or_else(|| AppError::Internal("Return request not loaded".to_string()))?;
  let new_status = request.status.apply(ReturnAction::Cancel)?;

  // Only a row still in the status we checked is withdrawn.
  let updated = sqlx::query_as::<_, ReturnRequest>(
    "UPDATE return_requests SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3 RETURNING *",
  )
  .bind(request.id)
  .bind(new_status)
  .bind(request.status)
  .fetch_optional(&pool)
  .await?
  .ok_or_else(|| AppError::Conflict("Return request changed; reload and try again".to_string()))?;

  info!(return_id = %updated.id, "Return request withdrawn by customer.");
  ctx_data.write().updated = Some(updated);
  Ok(PipelineControl::Continue)
}
