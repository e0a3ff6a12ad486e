// hopz-server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::{clean, run_flow};
use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::{SigninCtxData, SignupCtxData};
use crate::models::{PublicUser, User};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ProfilePayload {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChangePasswordPayload {
  pub current_password: String,
  pub new_password: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct NotificationPreferencesPayload {
  pub email_notifications: Option<bool>,
  pub promo_notifications: Option<bool>,
  pub whatsapp_order_notifications: Option<bool>,
  pub whatsapp_promo_notifications: Option<bool>,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> AppResult<HttpResponse> {
  let payload = req_payload.into_inner();
  let ctx = SignupCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    name: payload.name,
    phone: payload.phone,
    created_user: None,
    token: None,
  };

  // No signup step stops early; a missing user below means a step misbehaved.
  let (_, ctx) = run_flow(&app_state, ctx).await?;
  let user = ctx
    .created_user
    .ok_or_else(|| AppError::Internal("Signup completed without a user".to_string()))?;
  let token = ctx
    .token
    .ok_or_else(|| AppError::Internal("Signup completed without a token".to_string()))?;

  info!(user_id = %user.id, "Signup successful.");
  Ok(HttpResponse::Created().json(json!({ "user": PublicUser::from(&user), "token": token })))
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> AppResult<HttpResponse> {
  let payload = req_payload.into_inner();
  let ctx = SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    user: None,
    token: None,
  };

  let (_, ctx) = run_flow(&app_state, ctx).await?;
  let user = ctx.user.ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;
  let token = ctx
    .token
    .ok_or_else(|| AppError::Internal("Signin completed without a token".to_string()))?;

  info!(user_id = %user.id, "Login successful.");
  Ok(HttpResponse::Ok().json(json!({ "user": PublicUser::from(&user), "token": token })))
}

async fn load_user(app_state: &AppState, user_id: uuid::Uuid) -> AppResult<User> {
  sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
    .bind(user_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("User"))
}

#[instrument(name = "handler::me", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> AppResult<HttpResponse> {
  let user = load_user(&app_state, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[instrument(name = "handler::update_profile", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ProfilePayload>,
) -> AppResult<HttpResponse> {
  let payload = req_payload.into_inner();
  let user = sqlx::query_as::<_, User>(
    "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), updated_at = NOW()
     WHERE id = $1 RETURNING *",
  )
  .bind(auth_user.user_id)
  .bind(clean(payload.name))
  .bind(clean(payload.phone))
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::not_found("User"))?;
  Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[instrument(name = "handler::change_password", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn change_password_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ChangePasswordPayload>,
) -> AppResult<HttpResponse> {
  let payload = req_payload.into_inner();
  if payload.new_password.chars().count() < auth_service::MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "New password must be at least {} characters",
      auth_service::MIN_PASSWORD_LEN
    )));
  }

  let user = load_user(&app_state, auth_user.user_id).await?;
  if !auth_service::verify_password(&user.password_hash, &payload.current_password)? {
    return Err(AppError::Validation("Current password is incorrect".to_string()));
  }
  let new_hash = auth_service::hash_password(&payload.new_password)?;
  sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
    .bind(user.id)
    .bind(new_hash)
    .execute(&app_state.db_pool)
    .await?;

  info!("Password changed.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Password updated successfully" })))
}

#[instrument(name = "handler::notification_preferences", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn notification_preferences_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NotificationPreferencesPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  let user = sqlx::query_as::<_, User>(
    "UPDATE users SET
       email_notifications = COALESCE($2, email_notifications),
       promo_notifications = COALESCE($3, promo_notifications),
       whatsapp_order_notifications = COALESCE($4, whatsapp_order_notifications),
       whatsapp_promo_notifications = COALESCE($5, whatsapp_promo_notifications),
       updated_at = NOW()
     WHERE id = $1 RETURNING *",
  )
  .bind(auth_user.user_id)
  .bind(p.email_notifications)
  .bind(p.promo_notifications)
  .bind(p.whatsapp_order_notifications)
  .bind(p.whatsapp_promo_notifications)
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::not_found("User"))?;
  Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}
