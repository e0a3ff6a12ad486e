// hopz-server/src/services/audit.rs
use crate::errors::Result as AppResult;
use sqlx::PgExecutor;
use tracing::warn;
use uuid::Uuid;

pub struct AuditEntry<'a> {
  pub admin_id: Uuid,
  pub action: &'a str,
  pub entity: &'a str,
  pub entity_id: Option<String>,
  pub details: String,
}

pub async fn record<'e>(executor: impl PgExecutor<'e>, entry: AuditEntry<'_>) -> AppResult<()> {
  sqlx::query("INSERT INTO audit_logs (admin_id, action, entity, entity_id, details) VALUES ($1, $2, $3, $4, $5)")
    .bind(entry.admin_id)
    .bind(entry.action)
    .bind(entry.entity)
    .bind(&entry.entity_id)
    .bind(&entry.details)
    .execute(executor)
    .await?;
  Ok(())
}

/// Audit writes outside a transaction must not fail the admin action.
pub async fn record_quietly<'e>(executor: impl PgExecutor<'e>, entry: AuditEntry<'_>) {
  let action = entry.action.to_string();
  if let Err(e) = record(executor, entry).await {
    warn!(error = %e, %action, "Audit log write failed.");
  }
}
