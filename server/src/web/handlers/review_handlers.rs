// hopz-server/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::review::{Review, ReviewWithAuthor};
use crate::services::audit::{self, AuditEntry};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use hopz::review::ReviewDraft;

const REVIEW_WITH_AUTHOR_SELECT: &str =
  "SELECT r.*, u.name AS author_name FROM reviews r JOIN users u ON u.id = r.user_id";

#[derive(Deserialize, Debug)]
pub struct SubmitReviewPayload {
  pub product_id: Uuid,
  #[serde(flatten)]
  pub draft: ReviewDraft,
}

#[derive(Deserialize, Debug)]
pub struct ApprovalPayload {
  pub is_approved: bool,
}

#[derive(Deserialize, Debug)]
pub struct FeaturePayload {
  pub is_featured: bool,
}

#[instrument(name = "handler::product_reviews", skip(app_state))]
pub async fn product_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let reviews = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
    "{REVIEW_WITH_AUTHOR_SELECT} WHERE r.product_id = $1 AND r.is_approved
     ORDER BY r.is_featured DESC, r.created_at DESC"
  ))
  .bind(path.into_inner())
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(reviews))
}

/// Creates or replaces the caller's review of a product. Any edit goes back
/// into moderation.
#[instrument(name = "handler::submit_review", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id))]
pub async fn submit_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<SubmitReviewPayload>,
) -> AppResult<HttpResponse> {
  let SubmitReviewPayload { product_id, draft } = req_payload.into_inner();
  draft.validate()?;

  let purchased: bool = sqlx::query_scalar(
    "SELECT EXISTS (
       SELECT 1 FROM orders o JOIN order_items oi ON oi.order_id = o.id
       WHERE o.user_id = $1 AND oi.product_id = $2 AND o.status = 'DELIVERED'
     )",
  )
  .bind(auth_user.user_id)
  .bind(product_id)
  .fetch_one(&app_state.db_pool)
  .await?;
  if !purchased {
    return Err(AppError::Forbidden(
      "You can only review products from delivered orders".to_string(),
    ));
  }

  let review = sqlx::query_as::<_, Review>(
    "INSERT INTO reviews (product_id, user_id, rating, comment, recommend)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (product_id, user_id) DO UPDATE
       SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, recommend = EXCLUDED.recommend,
           is_approved = FALSE, updated_at = NOW()
     RETURNING *",
  )
  .bind(product_id)
  .bind(auth_user.user_id)
  .bind(draft.rating)
  .bind(draft.comment.trim())
  .bind(draft.recommend)
  .fetch_one(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Created().json(json!({
    "review": review,
    "message": "Review submitted for moderation",
  })))
}

#[instrument(name = "handler::admin_list_reviews", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn list_all_reviews_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let reviews = sqlx::query_as::<_, ReviewWithAuthor>(&format!(
    "{REVIEW_WITH_AUTHOR_SELECT} ORDER BY r.created_at DESC"
  ))
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(reviews))
}

async fn set_flag(app_state: &AppState, admin: &AdminUser, review_id: Uuid, column: Flag, value: bool) -> AppResult<Review> {
  let sql = match column {
    Flag::Approved => "UPDATE reviews SET is_approved = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    Flag::Featured => "UPDATE reviews SET is_featured = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
  };
  let review = sqlx::query_as::<_, Review>(sql)
    .bind(review_id)
    .bind(value)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Review"))?;

  audit::record_quietly(
    &app_state.db_pool,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: column.action(value),
      entity: "Review",
      entity_id: Some(review_id.to_string()),
      details: format!("Review {review_id} {}", column.action(value).to_lowercase()),
    },
  )
  .await;
  Ok(review)
}

#[derive(Debug, Clone, Copy)]
enum Flag {
  Approved,
  Featured,
}

impl Flag {
  fn action(self, value: bool) -> &'static str {
    match (self, value) {
      (Flag::Approved, true) => "APPROVE_REVIEW",
      (Flag::Approved, false) => "UNAPPROVE_REVIEW",
      (Flag::Featured, true) => "FEATURE_REVIEW",
      (Flag::Featured, false) => "UNFEATURE_REVIEW",
    }
  }
}

#[instrument(name = "handler::approve_review", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn approve_review_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ApprovalPayload>,
) -> AppResult<HttpResponse> {
  let review = set_flag(&app_state, &admin, path.into_inner(), Flag::Approved, req_payload.is_approved).await?;
  Ok(HttpResponse::Ok().json(review))
}

#[instrument(name = "handler::feature_review", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn feature_review_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<FeaturePayload>,
) -> AppResult<HttpResponse> {
  let review = set_flag(&app_state, &admin, path.into_inner(), Flag::Featured, req_payload.is_featured).await?;
  Ok(HttpResponse::Ok().json(review))
}

#[instrument(name = "handler::delete_review", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let review_id = path.into_inner();
  let removed = sqlx::query("DELETE FROM reviews WHERE id = $1")
    .bind(review_id)
    .execute(&app_state.db_pool)
    .await?;
  if removed.rows_affected() == 0 {
    return Err(AppError::not_found("Review"));
  }

  audit::record_quietly(
    &app_state.db_pool,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "DELETE_REVIEW",
      entity: "Review",
      entity_id: Some(review_id.to_string()),
      details: format!("Deleted review {review_id}"),
    },
  )
  .await;
  Ok(HttpResponse::Ok().json(json!({ "message": "Review deleted" })))
}
