// hopz-server/src/flows/decide_return_flow.rs

//! Admin decisions on a return request: approve, reject, complete.

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps::{self, StockChange};
use crate::flows::contexts::{DecideReturnCtxData, ReturnDecision};
use crate::models::ReturnRequest;
use crate::services::{audit, notification_service};
use hopz::lifecycle::returns::RefundStatus;
use hopz::notify::Draft;
use hopz::{ContextData, FlowError, Flows, Pipeline, PipelineControl, ReturnType};
use tracing::info;

/// Registers approve, reject and complete for return requests.
pub fn register_decide_return_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<DecideReturnCtxData, AppError>::new(
    "decide_return",
    &[
      ("load_request", false),
      ("check_state", false),
      ("persist_decision", false),
      ("notify_customer", true),
    ],
  );

  p.on("load_request", load_request)?;
  p.on("check_state", check_state)?;
  p.on("persist_decision", persist_decision)?;
  p.on("notify_customer", notify_customer)?;

  flows.register(p);
  info!("Decide-return flow registered.");
  Ok(())
}

async fn load_request(ctx_data: ContextData<DecideReturnCtxData>) -> AppResult<PipelineControl> {
  let (return_id, pool) = ctx_data.with(|c| (c.return_id, c.app_state.db_pool.clone()));
  let request = common_steps::load_return_request(&pool, return_id).await?;
  let order_number: Option<String> = sqlx::query_scalar("SELECT order_number FROM orders WHERE id = $1")
    .bind(request.order_id)
    .fetch_optional(&pool)
    .await?;

  {
    let mut guard = ctx_data.write();
    guard.request = Some(request);
    guard.order_number = order_number;
  }
  Ok(PipelineControl::Continue)
}

async fn check_state(ctx_data: ContextData<DecideReturnCtxData>) -> AppResult<PipelineControl> {
  let (status, action, reject_reason) = ctx_data.with(|c| {
    let reason = match &c.decision {
      ReturnDecision::Reject { reason, .. } => Some(reason.trim().to_string()),
      _ => None,
    };
    (c.request.as_ref().map(|r| r.status), c.decision.action(), reason)
  });
  let status = status.ok_or_else(|| AppError::Internal("Return request not loaded".to_string()))?;

  if reject_reason.as_deref() == Some("") {
    return Err(AppError::Validation("Rejection reason is required".to_string()));
  }
  status.apply(action)?;
  Ok(PipelineControl::Continue)
}

fn join_notes(lead: Option<String>, extra: Option<String>) -> Option<String> {
  let extra = extra.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
  match (lead, extra) {
    (Some(lead), Some(extra)) => Some(format!("{lead}\n{extra}")),
    (lead, extra) => lead.or(extra),
  }
}

async fn persist_decision(ctx_data: ContextData<DecideReturnCtxData>) -> AppResult<PipelineControl> {
  let (request, decision, actor, pool) =
    ctx_data.with(|c| (c.request.clone(), c.decision.clone(), c.actor.clone(), c.app_state.db_pool.clone()));
  let request = request.ok_or_else(|| AppError::Internal("Return request not loaded".to_string()))?;

  let mut tx = pool.begin().await?;
  // Two admins deciding at once: the second sees the first one's status here.
  let request = common_steps::lock_return_request(&mut tx, request.id).await?;
  let new_status = request.status.apply(decision.action())?;
  let (updated, audit_action, details) = match decision {
    ReturnDecision::Approve {
      pickup_scheduled,
      admin_notes,
    } => {
      let updated = sqlx::query_as::<_, ReturnRequest>(
        "UPDATE return_requests SET status = $2, pickup_scheduled = $3, admin_notes = COALESCE($4, admin_notes),
           updated_at = NOW()
         WHERE id = $1 RETURNING *",
      )
      .bind(request.id)
      .bind(new_status)
      .bind(pickup_scheduled)
      .bind(join_notes(None, admin_notes))
      .fetch_one(&mut *tx)
      .await?;
      (updated, "APPROVE_RETURN", "Return request approved".to_string())
    }
    ReturnDecision::Reject { reason, admin_notes } => {
      let notes = join_notes(Some(format!("Rejection reason: {}", reason.trim())), admin_notes);
      let updated = sqlx::query_as::<_, ReturnRequest>(
        "UPDATE return_requests SET status = $2, admin_notes = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
      )
      .bind(request.id)
      .bind(new_status)
      .bind(notes)
      .fetch_one(&mut *tx)
      .await?;
      (updated, "REJECT_RETURN", format!("Return request rejected: {}", reason.trim()))
    }
    ReturnDecision::Complete {
      refund_method,
      tracking_number,
      admin_notes,
      restock_items,
    } => {
      let refund_status = match request.return_type {
        ReturnType::Return => Some(RefundStatus::Processed),
        ReturnType::Exchange => request.refund_status,
      };
      let updated = sqlx::query_as::<_, ReturnRequest>(
        "UPDATE return_requests SET status = $2, refund_status = $3, refund_method = COALESCE($4, refund_method),
           tracking_number = COALESCE($5, tracking_number), admin_notes = COALESCE($6, admin_notes),
           processed_at = NOW(), updated_at = NOW()
         WHERE id = $1 RETURNING *",
      )
      .bind(request.id)
      .bind(new_status)
      .bind(refund_status)
      .bind(refund_method)
      .bind(tracking_number)
      .bind(join_notes(None, admin_notes))
      .fetch_one(&mut *tx)
      .await?;
      if restock_items {
        for line in request.items.iter() {
          common_steps::adjust_stock(&mut tx, line.product_id, &line.size, line.quantity, StockChange::Restock).await?;
        }
      }
      let details = match updated.refund_amount {
        Some(refund) if request.return_type == ReturnType::Return => format!("Return completed, refund {refund}"),
        _ => "Exchange completed".to_string(),
      };
      (updated, "COMPLETE_RETURN", details)
    }
  };

  audit::record(
    &mut *tx,
    audit::AuditEntry {
      admin_id: actor.user_id,
      action: audit_action,
      entity: "ReturnRequest",
      entity_id: Some(request.id.to_string()),
      details,
    },
  )
  .await?;
  tx.commit().await?;

  info!(return_id = %updated.id, status = %updated.status, "Return request decided.");
  ctx_data.write().updated = Some(updated);
  Ok(PipelineControl::Continue)
}

async fn notify_customer(ctx_data: ContextData<DecideReturnCtxData>) -> AppResult<PipelineControl> {
  let (state, updated, order_number) = ctx_data.with(|c| (c.app_state.clone(), c.updated.clone(), c.order_number.clone()));
  let Some(updated) = updated else {
    return Ok(PipelineControl::Continue);
  };
  let order_ref = order_number.unwrap_or_else(|| updated.order_id.to_string());
  let note = match updated.status {
    hopz::ReturnStatus::Rejected => updated.admin_notes.clone(),
    hopz::ReturnStatus::Completed => updated
      .refund_amount
      .filter(|_| updated.return_type == ReturnType::Return)
      .map(|r| format!("A refund of {r} has been processed.")),
    _ => None,
  };

  notification_service::dispatch(
    &state.db_pool,
    &state.config,
    Draft::return_decision(updated.user_id, &order_ref, updated.status, note.as_deref()),
  )
  .await;
  Ok(PipelineControl::Continue)
}
