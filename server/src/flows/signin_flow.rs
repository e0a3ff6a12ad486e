// hopz-server/src/flows/signin_flow.rs

use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::SigninCtxData;
use crate::models::User;
use crate::services::{auth_service, notification_service};
use hopz::notify::Draft;
use hopz::{ContextData, FlowError, Flows, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

const BAD_CREDENTIALS: &str = "Invalid credentials";

pub fn register_signin_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(
    "signin",
    &[
      ("validate_signin_input", false),
      ("fetch_user_by_email", false),
      ("verify_user_password", false),
      ("issue_token", false),
      ("record_login", true),
    ],
  );

  p.on("validate_signin_input", validate_signin_input)?;
  p.on("fetch_user_by_email", fetch_user_by_email)?;
  p.on("verify_user_password", verify_user_password)?;
  p.on("issue_token", issue_token)?;
  p.on("record_login", record_login)?;

  flows.register(p);
  info!("Sign-in flow registered.");
  Ok(())
}

async fn validate_signin_input(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (email, password_empty) = {
    let mut guard = ctx_data.write();
    guard.email = auth_service::normalize_email(&guard.email);
    (guard.email.clone(), guard.password.is_empty())
  };
  if email.is_empty() || password_empty {
    return Err(AppError::Validation("Email and password are required".to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn fetch_user_by_email(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (email, pool) = ctx_data.with(|c| (c.email.clone(), c.app_state.db_pool.clone()));

  event!(Level::DEBUG, %email, "Fetching user for signin.");
  let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
    .bind(&email)
    .fetch_optional(&pool)
    .await?;
  match user {
    Some(user) => {
      ctx_data.write().user = Some(user);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!(%email, "Signin for unknown email.");
      Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
    }
  }
}

async fn verify_user_password(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (hash, password, user_id) = ctx_data.with(|c| {
    (
      c.user.as_ref().map(|u| u.password_hash.clone()),
      c.password.clone(),
      c.user.as_ref().map(|u| u.id),
    )
  });
  let hash = hash.ok_or_else(|| AppError::Internal("Password check reached without a user".to_string()))?;

  if auth_service::verify_password(&hash, &password)? {
    Ok(PipelineControl::Continue)
  } else {
    warn!(user_id = ?user_id, "Password mismatch on signin.");
    Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
  }
}

async fn issue_token(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (user, config) = ctx_data.with(|c| (c.user.clone(), c.app_state.config.clone()));
  let user = user.ok_or_else(|| AppError::Internal("Signin reached token issue without a user".to_string()))?;

  let token = auth_service::issue_token(&config.token_secret, user.id, &user.email, user.role, config.token_ttl_hours)?;
  info!(user_id = %user.id, "Session token issued.");
  ctx_data.write().token = Some(token);
  Ok(PipelineControl::Continue)
}

async fn record_login(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (user, state) = ctx_data.with(|c| (c.user.clone(), c.app_state.clone()));
  if let Some(user) = user {
    notification_service::dispatch(&state.db_pool, &state.config, Draft::login(user.id, &user.email)).await;
  }
  Ok(PipelineControl::Continue)
}
