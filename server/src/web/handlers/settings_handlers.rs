// hopz-server/src/web/handlers/settings_handlers.rs

//! Site-wide settings (maintenance switch, banners) and editable content blocks.

use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};
use sqlx::types::Json;
use tracing::{info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::services::audit::{self, AuditEntry};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

const MAX_KEY_LEN: usize = 64;

fn check_key(key: &str) -> AppResult<()> {
  let valid = !key.is_empty()
    && key.len() <= MAX_KEY_LEN
    && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if valid {
    Ok(())
  } else {
    Err(AppError::Validation(format!("Invalid key '{key}'")))
  }
}

async fn settings_map(app_state: &AppState) -> AppResult<Map<String, Value>> {
  let rows: Vec<(String, Json<Value>)> = sqlx::query_as("SELECT key, value FROM site_settings ORDER BY key")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(rows.into_iter().map(|(k, v)| (k, v.0)).collect())
}

#[instrument(name = "handler::get_settings", skip_all)]
pub async fn get_settings_handler(app_state: web::Data<AppState>) -> AppResult<HttpResponse> {
  Ok(HttpResponse::Ok().json(settings_map(&app_state).await?))
}

/// Upserts every key in the body; keys not mentioned keep their value.
#[instrument(name = "handler::update_settings", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn update_settings_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<Map<String, Value>>,
) -> AppResult<HttpResponse> {
  let changes = req_payload.into_inner();
  if changes.is_empty() {
    return Err(AppError::Validation("No settings provided".to_string()));
  }
  for key in changes.keys() {
    check_key(key)?;
  }

  let mut tx = app_state.db_pool.begin().await?;
  for (key, value) in &changes {
    sqlx::query(
      "INSERT INTO site_settings (key, value) VALUES ($1, $2)
       ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(key)
    .bind(Json(value))
    .execute(&mut *tx)
    .await?;
  }
  let keys: Vec<&str> = changes.keys().map(String::as_str).collect();
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "UPDATE_SETTINGS",
      entity: "Settings",
      entity_id: None,
      details: format!("Updated settings: {}", keys.join(", ")),
    },
  )
  .await?;
  tx.commit().await?;

  app_state.maintenance.invalidate();
  info!(keys = ?keys, "Site settings updated.");
  Ok(HttpResponse::Ok().json(settings_map(&app_state).await?))
}

#[instrument(name = "handler::get_content", skip(app_state))]
pub async fn get_content_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> AppResult<HttpResponse> {
  let key = path.into_inner();
  check_key(&key)?;
  let content: Json<Value> = sqlx::query_scalar("SELECT content FROM site_content WHERE key = $1")
    .bind(&key)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Content"))?;
  Ok(HttpResponse::Ok().json(json!({ "key": key, "content": content.0 })))
}

#[instrument(name = "handler::put_content", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn put_content_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<String>,
  req_payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
  let key = path.into_inner();
  check_key(&key)?;
  let body = req_payload.into_inner();
  // Accept either {"content": ...} or the content itself.
  let content = match body {
    Value::Object(mut map) if map.len() == 1 && map.contains_key("content") => {
      map.remove("content").unwrap_or(Value::Null)
    }
    other => other,
  };

  let mut tx = app_state.db_pool.begin().await?;
  sqlx::query(
    "INSERT INTO site_content (key, content) VALUES ($1, $2)
     ON CONFLICT (key) DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()",
  )
  .bind(&key)
  .bind(Json(&content))
  .execute(&mut *tx)
  .await?;
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "UPDATE_CONTENT",
      entity: "Content",
      entity_id: Some(key.clone()),
      details: format!("Updated content block {key}"),
    },
  )
  .await?;
  tx.commit().await?;

  Ok(HttpResponse::Ok().json(json!({ "key": key, "content": content })))
}

#[cfg(test)]
mod tests {
  use super::check_key;

  #[test]
  fn keys_are_restricted_to_slug_characters() {
    assert!(check_key("maintenance_mode").is_ok());
    assert!(check_key("home-banner").is_ok());
    assert!(check_key("").is_err());
    assert!(check_key("drop table").is_err());
    assert!(check_key(&"k".repeat(65)).is_err());
  }
}
