// hopz-server/src/services/mailer.rs

//! Outbound mail stand-in. Messages are logged, never delivered.

use crate::errors::{AppError, Result as AppResult};
use tracing::{info, instrument};

#[derive(Debug)]
pub struct SentEmailInfo {
  pub to: String,
  pub subject: String,
  pub message_id: String,
}

pub const ADMIN_ALERT_RECIPIENT: &str = "orders@happyhopz.com";

#[instrument(name = "mailer::send", skip_all, fields(to = %to, subject = %subject))]
pub async fn send_mock_email(to: &str, from: &str, subject: &str, html_body: &str) -> AppResult<SentEmailInfo> {
  if !to.contains('@') {
    return Err(AppError::Internal(format!("Cannot mail invalid address '{to}'")));
  }
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;

  let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
  let preview: String = html_body.chars().take(60).collect();
  info!(%from, %message_id, %preview, "Mock email sent.");

  Ok(SentEmailInfo {
    to: to.to_string(),
    subject: subject.to_string(),
    message_id,
  })
}
