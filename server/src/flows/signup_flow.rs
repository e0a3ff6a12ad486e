// hopz-server/src/flows/signup_flow.rs

use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::SignupCtxData;
use crate::models::User;
use crate::services::{auth_service, notification_service};
use hopz::notify::Draft;
use hopz::{ContextData, FlowError, Flows, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

/// Registers the user sign-up flow.
pub fn register_signup_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<SignupCtxData, AppError>::new(
    "signup",
    &[
      ("validate_signup_input", false),
      ("check_existing_user", false),
      ("create_user", false),
      ("issue_token", false),
      ("notify_admins", true),
    ],
  );

  p.on("validate_signup_input", validate_signup_input)?;
  p.on("check_existing_user", check_existing_user)?;
  p.on("create_user", create_user)?;
  p.on("issue_token", issue_token)?;
  p.on("notify_admins", notify_admins)?;

  flows.register(p);
  info!("Sign-up flow registered.");
  Ok(())
}

async fn validate_signup_input(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (email, password_len) = {
    let mut guard = ctx_data.write();
    guard.email = auth_service::normalize_email(&guard.email);
    (guard.email.clone(), guard.password.chars().count())
  };

  event!(Level::DEBUG, %email, "Validating signup input.");
  if email.is_empty() || !email.contains('@') {
    return Err(AppError::Validation("Valid email is required".to_string()));
  }
  if password_len < auth_service::MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters",
      auth_service::MIN_PASSWORD_LEN
    )));
  }
  Ok(PipelineControl::Continue)
}

async fn check_existing_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (email, pool) = ctx_data.with(|c| (c.email.clone(), c.app_state.db_pool.clone()));

  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
    .bind(&email)
    .fetch_one(&pool)
    .await?;
  if exists {
    warn!(%email, "Signup attempted with an existing email.");
    return Err(AppError::Validation("User already exists".to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn create_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (email, password, name, phone, pool) = ctx_data.with(|c| {
    (
      c.email.clone(),
      c.password.clone(),
      c.name.clone().filter(|n| !n.trim().is_empty()),
      c.phone.clone().filter(|p| !p.trim().is_empty()),
      c.app_state.db_pool.clone(),
    )
  });

  let password_hash = auth_service::hash_password(&password)?;
  let user = sqlx::query_as::<_, User>(
    "INSERT INTO users (email, password_hash, name, phone) VALUES ($1, $2, $3, $4) RETURNING *",
  )
  .bind(&email)
  .bind(password_hash)
  .bind(name)
  .bind(phone)
  .fetch_one(&pool)
  .await?;

  info!(user_id = %user.id, "User created.");
  ctx_data.write().created_user = Some(user);
  Ok(PipelineControl::Continue)
}

async fn issue_token(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (user, config) = ctx_data.with(|c| (c.created_user.clone(), c.app_state.config.clone()));
  let user = user.ok_or_else(|| AppError::Internal("Signup reached token issue without a user".to_string()))?;

  let token = auth_service::issue_token(&config.token_secret, user.id, &user.email, user.role, config.token_ttl_hours)?;
  ctx_data.write().token = Some(token);
  Ok(PipelineControl::Continue)
}

async fn notify_admins(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (user, state) = ctx_data.with(|c| (c.created_user.clone(), c.app_state.clone()));
  if let Some(user) = user {
    notification_service::dispatch(&state.db_pool, &state.config, Draft::new_signup(user.id, &user.email)).await;
  }
  Ok(PipelineControl::Continue)
}
