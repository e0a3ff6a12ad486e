// hopz-server/src/services/maintenance.rs

//! Site-wide maintenance switch, read from `site_settings` through a short TTL cache.

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, ResponseError};
use parking_lot::Mutex;
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_MESSAGE: &str = "Happy Hopz is currently undergoing maintenance. We will be back soon!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceState {
  pub enabled: bool,
  pub message: String,
}

impl Default for MaintenanceState {
  fn default() -> Self {
    MaintenanceState {
      enabled: false,
      message: DEFAULT_MESSAGE.to_string(),
    }
  }
}

pub struct MaintenanceCache {
  ttl: Duration,
  slot: Mutex<Option<(MaintenanceState, Instant)>>,
}

impl MaintenanceCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, slot: Mutex::new(None) }
  }

  pub fn cached(&self, now: Instant) -> Option<MaintenanceState> {
    let slot = self.slot.lock();
    match slot.as_ref() {
      Some((state, expires)) if now < *expires => Some(state.clone()),
      _ => None,
    }
  }

  pub fn store(&self, state: MaintenanceState, now: Instant) {
    *self.slot.lock() = Some((state, now + self.ttl));
  }

  pub fn invalidate(&self) {
    *self.slot.lock() = None;
  }

  pub async fn current(&self, pool: &PgPool) -> Result<MaintenanceState, sqlx::Error> {
    let now = Instant::now();
    if let Some(state) = self.cached(now) {
      return Ok(state);
    }
    debug!("Maintenance cache miss, reading settings.");
    let state = load(pool).await?;
    self.store(state.clone(), now);
    Ok(state)
  }
}

async fn load(pool: &PgPool) -> Result<MaintenanceState, sqlx::Error> {
  let rows: Vec<(String, serde_json::Value)> =
    sqlx::query_as("SELECT key, value FROM site_settings WHERE key IN ('maintenance_mode', 'maintenance_message')")
      .fetch_all(pool)
      .await?;

  let mut state = MaintenanceState::default();
  for (key, value) in rows {
    match key.as_str() {
      "maintenance_mode" => state.enabled = value.as_bool().unwrap_or_else(|| value.as_str() == Some("true")),
      "maintenance_message" => {
        if let Some(msg) = value.as_str().filter(|m| !m.trim().is_empty()) {
          state.message = msg.to_string();
        }
      }
      _ => {}
    }
  }
  Ok(state)
}

pub fn is_exempt(path: &str) -> bool {
  path.contains("/admin") || path.contains("/auth/login") || path == "/health" || path == "/api/health"
}

/// Middleware: answers 503 while maintenance is on. Lookup failures let the request through.
pub async fn gate(req: ServiceRequest, next: Next<impl MessageBody + 'static>) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
  if !is_exempt(req.path()) {
    if let Some(state) = req.app_data::<web::Data<AppState>>() {
      match state.maintenance.current(&state.db_pool).await {
        Ok(m) if m.enabled => {
          let response = AppError::Maintenance(m.message).error_response();
          return Ok(req.into_response(response).map_into_right_body());
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Maintenance check failed, allowing request."),
      }
    }
  }
  next.call(req).await.map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cache_expires_after_ttl() {
    let cache = MaintenanceCache::new(Duration::from_secs(60));
    let t0 = Instant::now();
    assert!(cache.cached(t0).is_none());

    let on = MaintenanceState { enabled: true, message: "back at 6".into() };
    cache.store(on.clone(), t0);
    assert_eq!(cache.cached(t0 + Duration::from_secs(59)), Some(on));
    assert!(cache.cached(t0 + Duration::from_secs(61)).is_none());

    cache.store(MaintenanceState::default(), t0);
    cache.invalidate();
    assert!(cache.cached(t0).is_none());
  }

  #[test]
  fn admin_login_and_health_bypass_the_gate() {
    assert!(is_exempt("/api/admin/returns"));
    assert!(is_exempt("/api/auth/login"));
    assert!(is_exempt("/health"));
    assert!(!is_exempt("/api/products"));
    assert!(!is_exempt("/api/auth/signup"));
  }
}
