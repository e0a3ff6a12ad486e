// hopz-server/src/web/handlers/search_handlers.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::Result as AppResult;
use crate::models::{Order, Product};
use crate::state::AppState;
use crate::web::extractors::OptionalUser;

const MIN_QUERY_CHARS: usize = 2;

#[derive(Deserialize, Debug)]
pub struct SearchQuery {
  #[serde(default)]
  pub q: String,
}

#[instrument(name = "handler::search", skip(app_state, user))]
pub async fn search_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
  let term = query.q.trim();
  if term.chars().count() < MIN_QUERY_CHARS {
    return Ok(HttpResponse::Ok().json(json!({ "products": [], "orders": [], "categories": [] })));
  }
  let pattern = format!("%{term}%");

  let products = sqlx::query_as::<_, Product>(
    "SELECT * FROM products
     WHERE status = 'ACTIVE'
       AND (name ILIKE $1 OR description ILIKE $1 OR category ILIKE $1
            OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE $1))
     ORDER BY name LIMIT 10",
  )
  .bind(&pattern)
  .fetch_all(&app_state.db_pool)
  .await?;

  let orders = match &user.0 {
    Some(user) => {
      sqlx::query_as::<_, Order>(
        "SELECT * FROM orders
         WHERE user_id = $1 AND (id::text ILIKE $2 OR order_number ILIKE $2 OR tracking_number ILIKE $2)
         ORDER BY created_at DESC LIMIT 5",
      )
      .bind(user.user_id)
      .bind(&pattern)
      .fetch_all(&app_state.db_pool)
      .await?
    }
    None => Vec::new(),
  };

  let categories: Vec<String> = sqlx::query_scalar(
    "SELECT DISTINCT category FROM products WHERE status = 'ACTIVE' AND category ILIKE $1 ORDER BY category LIMIT 5",
  )
  .bind(&pattern)
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "products": products, "orders": orders, "categories": categories })))
}
