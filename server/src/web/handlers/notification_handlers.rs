// hopz-server/src/web/handlers/notification_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::Notification;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};

const FEED_LIMIT: i64 = 50;

#[instrument(name = "handler::my_notifications", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn my_notifications_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let notifications = sqlx::query_as::<_, Notification>(
    "SELECT * FROM notifications WHERE user_id = $1 AND NOT is_admin ORDER BY created_at DESC LIMIT $2",
  )
  .bind(auth_user.user_id)
  .bind(FEED_LIMIT)
  .fetch_all(&app_state.db_pool)
  .await?;
  let unread = notifications.iter().filter(|n| !n.is_read).count();
  Ok(HttpResponse::Ok().json(json!({ "notifications": notifications, "unread_count": unread })))
}

/// Admins may mark entries of the admin feed as read too.
#[instrument(name = "handler::mark_notification_read", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn mark_read_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let updated = sqlx::query_as::<_, Notification>(
    "UPDATE notifications SET is_read = TRUE
     WHERE id = $1 AND (user_id = $2 OR (is_admin AND $3))
     RETURNING *",
  )
  .bind(path.into_inner())
  .bind(auth_user.user_id)
  .bind(auth_user.is_admin())
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::not_found("Notification"))?;
  Ok(HttpResponse::Ok().json(updated))
}

#[instrument(name = "handler::mark_all_notifications_read", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn mark_all_read_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
    .bind(auth_user.user_id)
    .execute(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "updated": result.rows_affected() })))
}

#[instrument(name = "handler::admin_notifications", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn admin_notifications_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let notifications = sqlx::query_as::<_, Notification>(
    "SELECT * FROM notifications WHERE is_admin ORDER BY created_at DESC LIMIT $1",
  )
  .bind(FEED_LIMIT)
  .fetch_all(&app_state.db_pool)
  .await?;
  let unread = notifications.iter().filter(|n| !n.is_read).count();
  Ok(HttpResponse::Ok().json(json!({ "notifications": notifications, "unread_count": unread })))
}
