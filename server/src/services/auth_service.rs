// hopz-server/src/services/auth_service.rs

//! Password hashing, bearer tokens and test-account screening.

use crate::errors::AppError;
use crate::models::Role;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, error, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";
const MAX_TOKEN_LEN: usize = 2048;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Hashes a plain-text password with Argon2.
///
/// # Arguments
/// * `password`: The plain-text password. Length rules are checked by the caller.
///
/// # Returns
/// The PHC-formatted hash string (salt and parameters included), or an
/// `AppError::Validation` when the password is empty.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng); // fresh salt per hash
  Argon2::default() // default params, stored in the hash so they can change later
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {argon_err}"))
    })
}

/// Checks a plain-text password against a stored Argon2 hash.
///
/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {parse_err}"))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {other}")))
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub email: String,
  pub role: Role,
  /// Expiry as unix seconds.
  pub exp: i64,
}

fn mac_for(secret: &str) -> Result<HmacSha256, AppError> {
  HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Internal(format!("Token key rejected: {e}")))
}

/// Issues a bearer token for a signed-in user.
///
/// The token is `v1.<claims>.<hmac>`, both parts base64url-encoded. The HMAC
/// covers the encoded claims, so [`verify_token`] checks it before decoding.
///
/// # Arguments
/// * `secret`: The server's `TOKEN_SECRET`.
/// * `user_id`, `email`, `role`: Copied into the claims. Role changes only take
///   effect once the user signs in again.
/// * `ttl_hours`: Lifetime from now.
///
/// # Returns
/// The encoded token, or `AppError::Internal` if the secret is unusable.
pub fn issue_token(secret: &str, user_id: Uuid, email: &str, role: Role, ttl_hours: i64) -> Result<String, AppError> {
  let claims = Claims {
    sub: user_id,
    email: email.to_string(),
    role,
    exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
  };
  let payload = serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.to_string()))?;
  let payload_part = URL_SAFE_NO_PAD.encode(payload);

  let mut mac = mac_for(secret)?;
  mac.update(payload_part.as_bytes());
  let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

  Ok(format!("{TOKEN_VERSION}.{payload_part}.{sig_part}"))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
  let invalid = || AppError::Auth("Invalid token".to_string());
  if token.len() > MAX_TOKEN_LEN {
    return Err(invalid());
  }

  let mut parts = token.split('.');
  let (Some(version), Some(payload_part), Some(sig_part), None) = (parts.next(), parts.next(), parts.next(), parts.next())
  else {
    return Err(invalid());
  };
  if version != TOKEN_VERSION {
    return Err(invalid());
  }

  let signature = URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| invalid())?;
  let mut mac = mac_for(secret)?;
  mac.update(payload_part.as_bytes());
  // Constant-time compare; claims are not parsed until this passes.
  mac.verify_slice(&signature).map_err(|_| invalid())?;

  let payload = URL_SAFE_NO_PAD.decode(payload_part).map_err(|_| invalid())?;
  let claims: Claims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
  if claims.exp < Utc::now().timestamp() {
    return Err(AppError::Auth("Token expired".to_string()));
  }
  Ok(claims)
}

const TEST_DOMAINS: [&str; 4] = ["test.com", "example.com", "lovable.dev", "dummy.com"];
const TEST_EMAILS: [&str; 4] = ["user@test.com", "test@test.com", "test2@example.com", "unverified@test.com"];

/// Seeded QA accounts that must not reach the live storefront.
pub fn is_test_account(email: &str) -> bool {
  let lower = email.trim().to_lowercase();
  if lower.is_empty() {
    return false;
  }
  let domain = lower.split('@').nth(1).unwrap_or_default();
  TEST_DOMAINS.contains(&domain)
    || TEST_EMAILS.contains(&lower.as_str())
    || lower.contains("testuser")
    || lower.starts_with("test.")
}

pub fn normalize_email(raw: &str) -> String {
  raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "unit-test-secret-0123456789";

  #[test]
  fn tokens_verify_with_the_issuing_secret_only() {
    let id = Uuid::new_v4();
    let token = issue_token(SECRET, id, "asha@hopz.in", Role::User, 1).unwrap();
    let claims = verify_token(SECRET, &token).unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(claims.role, Role::User);

    assert!(verify_token("another-secret-0123456789", &token).is_err());
  }

  #[test]
  fn tampered_and_expired_tokens_are_rejected() {
    let token = issue_token(SECRET, Uuid::new_v4(), "asha@hopz.in", Role::User, 1).unwrap();
    let forged_claims = Claims {
      sub: Uuid::new_v4(),
      email: "asha@hopz.in".into(),
      role: Role::Admin,
      exp: i64::MAX,
    };
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
    let sig = token.rsplit('.').next().unwrap();
    assert!(verify_token(SECRET, &format!("v1.{forged_payload}.{sig}")).is_err());

    let expired = issue_token(SECRET, Uuid::new_v4(), "asha@hopz.in", Role::User, -1).unwrap();
    assert!(matches!(verify_token(SECRET, &expired), Err(AppError::Auth(m)) if m == "Token expired"));
    assert!(verify_token(SECRET, "garbage").is_err());
  }

  #[test]
  fn password_round_trip() {
    let hash = hash_password("tiny-feet").unwrap();
    assert!(verify_password(&hash, "tiny-feet").unwrap());
    assert!(!verify_password(&hash, "big-feet").unwrap());
  }

  #[test]
  fn test_accounts_are_recognised() {
    assert!(is_test_account("someone@example.com"));
    assert!(is_test_account("Test.Parent@gmail.com"));
    assert!(is_test_account("my_testuser_01@gmail.com"));
    assert!(!is_test_account("parent@gmail.com"));
    assert!(!is_test_account(""));
  }
}
