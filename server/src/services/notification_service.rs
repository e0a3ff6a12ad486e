// hopz-server/src/services/notification_service.rs

//! Persists notification drafts and forwards admin order alerts to the mailer.

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::models::Notification;
use crate::services::mailer;
use hopz::notify::Draft;
use sqlx::PgExecutor;
use std::sync::Arc;
use tracing::{instrument, warn};

const INSERT_NOTIFICATION: &str = "INSERT INTO notifications (user_id, is_admin, title, message, kind, priority, metadata)
   VALUES ($1, $2, $3, $4, $5, $6, $7)
   RETURNING id, user_id, is_admin, title, message, kind, priority, is_read, metadata, created_at";

pub async fn insert<'e>(executor: impl PgExecutor<'e>, draft: &Draft) -> AppResult<Notification> {
  let row = sqlx::query_as::<_, Notification>(INSERT_NOTIFICATION)
    .bind(draft.user_id())
    .bind(draft.is_admin())
    .bind(&draft.title)
    .bind(&draft.message)
    .bind(draft.kind)
    .bind(draft.priority)
    .bind(&draft.metadata)
    .fetch_one(executor)
    .await?;
  Ok(row)
}

/// Best effort: a failed notification is logged and never fails the caller.
#[instrument(name = "notification_service::dispatch", skip_all, fields(kind = ?draft.kind, admin = draft.is_admin()))]
pub async fn dispatch<'e>(executor: impl PgExecutor<'e>, config: &Arc<AppConfig>, draft: Draft) -> Option<Notification> {
  let stored = match insert(executor, &draft).await {
    Ok(n) => Some(n),
    Err(e) => {
      warn!(error = %e, title = %draft.title, "Failed to store notification.");
      None
    }
  };

  if draft.should_alert_admin() {
    let config = config.clone();
    tokio::spawn(async move {
      let body = format!("<p>{}</p>", draft.message);
      if let Err(e) = mailer::send_mock_email(mailer::ADMIN_ALERT_RECIPIENT, &config.mail_sender, &draft.title, &body).await {
        warn!(error = %e, "Failed to send admin alert email.");
      }
    });
  }
  stored
}
