// hopz-server/src/web/handlers/health_handlers.rs

use actix_web::HttpResponse;
use serde_json::json;

pub async fn health_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
