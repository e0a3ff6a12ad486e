// hopz-server/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use hopz::{FlowError, RuleViolation};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("{0}")]
  Rule(#[from] RuleViolation),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Maintenance Mode: {0}")]
  Maintenance(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => match err.downcast::<RuleViolation>() {
        Ok(rule) => AppError::Rule(rule),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

impl AppError {
  pub fn not_found(what: &str) -> Self {
    AppError::NotFound(format!("{what} not found"))
  }

  pub fn admin_only() -> Self {
    AppError::Forbidden("Admin access required".to_string())
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Rule(rule) if rule.is_not_found() => StatusCode::NOT_FOUND,
      AppError::Rule(rule) if rule.is_conflict() => StatusCode::CONFLICT,
      AppError::Rule(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Maintenance(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Flow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Request rejected");
    }

    let body = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::Payment(m) => json!({ "error": m }),
      AppError::Rule(rule) => json!({ "error": rule.to_string() }),
      AppError::Maintenance(m) => json!({ "error": "Maintenance Mode", "message": m }),
      AppError::Config(m) => json!({ "error": "Configuration issue", "detail": m }),
      AppError::Sqlx(_) => json!({ "error": "Database operation failed" }),
      AppError::Flow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({ "error": "Workflow processing error" })
      }
      AppError::Internal(_) => json!({ "error": "An internal error occurred" }),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use hopz::OrderStatus;

  #[test]
  fn rule_violations_map_to_client_errors() {
    let not_cancellable = AppError::from(RuleViolation::NotCancellable { status: OrderStatus::Shipped });
    assert_eq!(not_cancellable.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::from(RuleViolation::OpenReturnExists).status_code(), StatusCode::CONFLICT);
    assert_eq!(AppError::from(RuleViolation::CouponInactive).status_code(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn database_errors_hide_details() {
    let err = AppError::Sqlx(sqlx::Error::RowNotFound);
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
