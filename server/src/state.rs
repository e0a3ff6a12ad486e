// hopz-server/src/state.rs
use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::flows;
use crate::services::maintenance::MaintenanceCache;
use hopz::Flows;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flows: Arc<Flows<AppError>>,
  pub config: Arc<AppConfig>,
  pub maintenance: Arc<MaintenanceCache>,
}

impl AppState {
  /// Builds the shared state and registers every business flow.
  pub fn build(db_pool: PgPool, config: Arc<AppConfig>) -> AppResult<Self> {
    let flows = Arc::new(Flows::<AppError>::new());
    flows::register_all_flows(&flows)?;
    Ok(AppState {
      db_pool,
      maintenance: Arc::new(MaintenanceCache::new(config.maintenance_cache_ttl)),
      flows,
      config,
    })
  }
}
