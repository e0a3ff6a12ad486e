// hopz-server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use hopz::pricing::{Money, ShippingPolicy};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub token_secret: String,
  pub token_ttl_hours: i64,
  pub payment_key_secret: String,
  pub mail_sender: String,
  pub return_window_days: i64,
  pub shipping: ShippingPolicy,
  pub maintenance_cache_ttl: Duration,
  pub run_migrations: bool,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("token_ttl_hours", &self.token_ttl_hours)
      .field("mail_sender", &self.mail_sender)
      .field("return_window_days", &self.return_window_days)
      .field("shipping", &self.shipping)
      .field("maintenance_cache_ttl", &self.maintenance_cache_ttl)
      .field("run_migrations", &self.run_migrations)
      .finish()
  }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  match lookup(name) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {name} value '{raw}': {e}"))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |name: &str| lookup(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{name}'")));

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(&lookup, "SERVER_PORT", 5000u16)?;
    let database_url = required("DATABASE_URL")?;
    let token_secret = required("TOKEN_SECRET")?;
    if token_secret.len() < 16 {
      return Err(AppError::Config("TOKEN_SECRET must be at least 16 bytes".to_string()));
    }
    let token_ttl_hours = parse_or(&lookup, "TOKEN_TTL_HOURS", 168i64)?;
    let payment_key_secret = lookup("PAYMENT_KEY_SECRET").unwrap_or_else(|| "mock_payment_secret".to_string());
    let mail_sender = lookup("MAIL_SENDER").unwrap_or_else(|| "noreply@happyhopz.com".to_string());
    let return_window_days = parse_or(&lookup, "RETURN_WINDOW_DAYS", 14i64)?;
    let shipping = ShippingPolicy {
      free_threshold: Money::from_paise(parse_or(&lookup, "FREE_SHIPPING_THRESHOLD_PAISE", 49_900i64)?),
      fee: Money::from_paise(parse_or(&lookup, "SHIPPING_FEE_PAISE", 0i64)?),
    };
    let maintenance_cache_ttl = Duration::from_secs(parse_or(&lookup, "MAINTENANCE_CACHE_SECS", 60u64)?);
    let run_migrations = parse_or(&lookup, "RUN_MIGRATIONS", false)?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      token_secret,
      token_ttl_hours,
      payment_key_secret,
      mail_sender,
      return_window_days,
      shipping,
      maintenance_cache_ttl,
      run_migrations,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_fill_optional_values() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://localhost/hopz"),
      ("TOKEN_SECRET", "0123456789abcdef0123"),
    ]))
    .unwrap();
    assert_eq!(cfg.server_port, 5000);
    assert_eq!(cfg.return_window_days, 14);
    assert_eq!(cfg.shipping.free_threshold, Money::from_rupees(499));
    assert_eq!(cfg.maintenance_cache_ttl, Duration::from_secs(60));
    assert!(!cfg.run_migrations);
  }

  #[test]
  fn missing_secret_and_bad_numbers_are_config_errors() {
    let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("TOKEN_SECRET")));

    let err = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://x"),
      ("TOKEN_SECRET", "0123456789abcdef0123"),
      ("SERVER_PORT", "eighty"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("SERVER_PORT")));
  }
}
