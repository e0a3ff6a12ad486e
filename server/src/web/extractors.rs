// hopz-server/src/web/extractors.rs

//! Request guards built on the bearer token: `AuthenticatedUser`,
//! `OptionalUser`, `AdminUser` and `StaffUser`.

use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::Actor;
use crate::models::Role;
use crate::services::auth_service;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::{http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub email: String,
  pub role: Role,
}

impl AuthenticatedUser {
  pub fn is_admin(&self) -> bool {
    self.role.is_admin()
  }

  pub fn actor(&self) -> Actor {
    Actor {
      user_id: self.user_id,
      email: self.email.clone(),
      is_admin: self.is_admin(),
    }
  }
}

/// The token from `Authorization: Bearer …`, or from `?token=` for links
/// opened outside the app such as shipping-label downloads.
fn bearer_token(req: &HttpRequest) -> Option<String> {
  let from_header = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty());
  from_header.or_else(|| {
    web::Query::<HashMap<String, String>>::from_query(req.query_string())
      .ok()
      .and_then(|q| q.get("token").cloned())
      .filter(|t| !t.is_empty())
  })
}

fn authenticate(req: &HttpRequest) -> AppResult<AuthenticatedUser> {
  let token = bearer_token(req).ok_or_else(|| AppError::Auth("No token provided".to_string()))?;
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state not configured".to_string()))?;
  let claims = auth_service::verify_token(&state.config.token_secret, &token)?;

  if !claims.role.is_admin() && auth_service::is_test_account(&claims.email) {
    warn!(email = %claims.email, "Blocked test account on authenticated route.");
    return Err(AppError::Forbidden("Test accounts are not allowed".to_string()));
  }
  Ok(AuthenticatedUser {
    user_id: claims.sub,
    email: claims.email,
    role: claims.role,
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authenticate(req))
  }
}

/// Guest-friendly routes: any token problem, test accounts included, means "guest".
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl FromRequest for OptionalUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let user = match authenticate(req) {
      Ok(user) => Some(user),
      Err(e) => {
        debug!(reason = %e, "Treating request as guest.");
        None
      }
    };
    ready(Ok(OptionalUser(user)))
  }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authenticate(req).and_then(|user| {
      if user.is_admin() {
        Ok(AdminUser(user))
      } else {
        Err(AppError::admin_only())
      }
    }))
  }
}

/// Staff or admin.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthenticatedUser);

impl FromRequest for StaffUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authenticate(req).and_then(|user| {
      if user.role.is_staff() {
        Ok(StaffUser(user))
      } else {
        Err(AppError::Forbidden("Staff access required".to_string()))
      }
    }))
  }
}
