// hopz-server/src/lib.rs

//! Happy Hopz storefront REST API: actix-web handlers over Postgres, with
//! multi-step operations sequenced by `hopz::flow` pipelines.

pub mod config;
pub mod errors;
pub mod flows;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

pub use config::AppConfig;
pub use errors::AppError;
pub use state::AppState;
