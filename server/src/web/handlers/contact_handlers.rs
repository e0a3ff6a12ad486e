// hopz-server/src/web/handlers/contact_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::filter_value;
use crate::errors::{AppError, Result as AppResult};
use crate::models::ContactForm;
use crate::services::notification_service;
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use hopz::marketing::{ContactDraft, ContactStatus};
use hopz::notify::Draft;

#[derive(Deserialize, Debug, Default)]
pub struct ContactListQuery {
  pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ContactStatusPayload {
  #[serde(default)]
  pub status: Option<String>,
}

/// Public contact form. Admins get an in-app notification for each enquiry.
#[instrument(name = "handler::submit_contact", skip_all)]
pub async fn submit_contact_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ContactDraft>,
) -> AppResult<HttpResponse> {
  let draft = req_payload.into_inner();
  draft.validate()?;

  let contact = sqlx::query_as::<_, ContactForm>(
    "INSERT INTO contact_forms (name, email, subject, message) VALUES ($1, $2, $3, $4) RETURNING *",
  )
  .bind(draft.name.trim())
  .bind(draft.email.trim().to_lowercase())
  .bind(draft.subject.trim())
  .bind(draft.message.trim())
  .fetch_one(&app_state.db_pool)
  .await?;

  notification_service::dispatch(
    &app_state.db_pool,
    &app_state.config,
    Draft::contact_received(contact.id, &contact.name, &contact.subject),
  )
  .await;
  info!(contact_id = %contact.id, "Contact form received.");
  Ok(HttpResponse::Created().json(contact))
}

#[instrument(name = "handler::list_contacts", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn list_contacts_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<ContactListQuery>,
) -> AppResult<HttpResponse> {
  let status = filter_value(query.into_inner().status)
    .map(|s| s.parse::<ContactStatus>())
    .transpose()?;
  let entries = sqlx::query_as::<_, ContactForm>(
    "SELECT * FROM contact_forms WHERE ($1::contact_status IS NULL OR status = $1) ORDER BY created_at DESC",
  )
  .bind(status)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(entries))
}

#[instrument(name = "handler::update_contact", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn update_contact_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ContactStatusPayload>,
) -> AppResult<HttpResponse> {
  let status: ContactStatus = req_payload
    .into_inner()
    .status
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| AppError::Validation("Status is required".to_string()))?
    .parse()?;

  let entry = sqlx::query_as::<_, ContactForm>(
    "UPDATE contact_forms SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
  )
  .bind(path.into_inner())
  .bind(status)
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::not_found("Contact entry"))?;
  Ok(HttpResponse::Ok().json(entry))
}
