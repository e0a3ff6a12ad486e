// hopz-server/src/web/handlers/address_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::clean;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{Address, AddressSnapshot};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddressPayload {
  #[serde(flatten)]
  pub address: AddressSnapshot,
  #[serde(default)]
  pub is_default: bool,
}

#[instrument(name = "handler::list_addresses", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let addresses = sqlx::query_as::<_, Address>(
    "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
  )
  .bind(auth_user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(addresses))
}

#[instrument(name = "handler::create_address", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn create_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<AddressPayload>,
) -> AppResult<HttpResponse> {
  let AddressPayload { address, is_default } = req_payload.into_inner();
  address.validate().map_err(AppError::Validation)?;

  let mut tx = app_state.db_pool.begin().await?;
  if is_default {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
      .bind(auth_user.user_id)
      .execute(&mut *tx)
      .await?;
  }
  let created = sqlx::query_as::<_, Address>(
    "INSERT INTO addresses (user_id, name, phone, line1, line2, city, state, pincode, is_default)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
  )
  .bind(auth_user.user_id)
  .bind(address.name.trim())
  .bind(address.phone.trim())
  .bind(address.line1.trim())
  .bind(clean(address.line2.clone()))
  .bind(address.city.trim())
  .bind(address.state.trim())
  .bind(address.pincode.trim())
  .bind(is_default)
  .fetch_one(&mut *tx)
  .await?;
  tx.commit().await?;

  Ok(HttpResponse::Created().json(created))
}

#[instrument(name = "handler::delete_address", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
    .bind(path.into_inner())
    .bind(auth_user.user_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::not_found("Address"));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Address deleted" })))
}
