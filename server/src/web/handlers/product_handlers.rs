// hopz-server/src/web/handlers/product_handlers.rs

//! Catalogue reads for everyone, catalogue writes for admins.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::clean;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{Product, ProductStatus};
use crate::services::audit::{self, AuditEntry};
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use hopz::inventory::Inventory;
use hopz::pricing::Money;

#[derive(Deserialize, Debug, Default)]
pub struct ProductListQuery {
  pub category: Option<String>,
  pub age_group: Option<String>,
  pub search: Option<String>,
  /// Paise.
  pub min_price: Option<i64>,
  /// Paise.
  pub max_price: Option<i64>,
  pub status: Option<ProductStatus>,
}

#[derive(Deserialize, Debug)]
pub struct CreateProductPayload {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub price: Money,
  #[serde(default)]
  pub discount_price: Option<Money>,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub sizes: Vec<String>,
  #[serde(default)]
  pub colors: Vec<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub inventory: Option<Inventory>,
  pub category: String,
  #[serde(default)]
  pub age_group: Option<String>,
  #[serde(default)]
  pub status: Option<ProductStatus>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateProductPayload {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Money>,
  pub discount_price: Option<Money>,
  #[serde(default)]
  pub clear_discount: bool,
  pub images: Option<Vec<String>>,
  pub sizes: Option<Vec<String>>,
  pub colors: Option<Vec<String>>,
  pub tags: Option<Vec<String>>,
  pub inventory: Option<Inventory>,
  pub category: Option<String>,
  pub age_group: Option<String>,
  pub status: Option<ProductStatus>,
}

fn validate_prices(price: Money, discount_price: Option<Money>) -> AppResult<()> {
  if price.is_negative() {
    return Err(AppError::Validation("Price cannot be negative".to_string()));
  }
  if discount_price.is_some_and(|d| d.is_negative() || d > price) {
    return Err(AppError::Validation("Discount price must be between 0 and the price".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductListQuery>,
) -> AppResult<HttpResponse> {
  let q = query.into_inner();
  let status = q.status.unwrap_or(ProductStatus::Active);
  if status == ProductStatus::Deleted {
    return Ok(HttpResponse::Ok().json(Vec::<Product>::new()));
  }
  let search = clean(q.search).map(|s| format!("%{s}%"));

  let products = sqlx::query_as::<_, Product>(
    "SELECT * FROM products
     WHERE status = $1
       AND ($2::text IS NULL OR category = $2)
       AND ($3::text IS NULL OR age_group = $3)
       AND ($4::text IS NULL OR name ILIKE $4 OR description ILIKE $4
            OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE $4))
       AND ($5::bigint IS NULL OR LEAST(price, COALESCE(discount_price, price)) >= $5)
       AND ($6::bigint IS NULL OR LEAST(price, COALESCE(discount_price, price)) <= $6)
     ORDER BY created_at DESC",
  )
  .bind(status)
  .bind(clean(q.category))
  .bind(clean(q.age_group))
  .bind(search)
  .bind(q.min_price)
  .bind(q.max_price)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
  let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND status <> 'DELETED'")
    .bind(path.into_inner())
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product"))?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::create_product", skip_all, fields(admin_id = %admin.0.user_id, name = %req_payload.name))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<CreateProductPayload>,
) -> AppResult<HttpResponse> {
  let p = req_payload.into_inner();
  if p.name.trim().is_empty() || p.category.trim().is_empty() {
    return Err(AppError::Validation("Name and category are required".to_string()));
  }
  validate_prices(p.price, p.discount_price)?;
  let inventory = match p.inventory {
    Some(inv) if !inv.entries().is_empty() => inv,
    _ => Inventory::default_for(&p.sizes),
  };

  let mut tx = app_state.db_pool.begin().await?;
  let product = sqlx::query_as::<_, Product>(
    "INSERT INTO products (name, description, price, discount_price, images, sizes, colors, tags, inventory, stock,
       category, age_group, status)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *",
  )
  .bind(p.name.trim())
  .bind(p.description.trim())
  .bind(p.price)
  .bind(p.discount_price)
  .bind(&p.images)
  .bind(&p.sizes)
  .bind(&p.colors)
  .bind(&p.tags)
  .bind(Json(&inventory))
  .bind(inventory.total())
  .bind(p.category.trim())
  .bind(clean(p.age_group))
  .bind(p.status.unwrap_or(ProductStatus::Active))
  .fetch_one(&mut *tx)
  .await?;
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "CREATE_PRODUCT",
      entity: "Product",
      entity_id: Some(product.id.to_string()),
      details: format!("Created product {}", product.name),
    },
  )
  .await?;
  tx.commit().await?;

  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(app_state, admin, req_payload), fields(admin_id = %admin.0.user_id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateProductPayload>,
) -> AppResult<HttpResponse> {
  let product_id = path.into_inner();
  let p = req_payload.into_inner();

  let mut tx = app_state.db_pool.begin().await?;
  let mut product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Product"))?;

  if let Some(name) = clean(p.name) {
    product.name = name;
  }
  if let Some(description) = p.description {
    product.description = description.trim().to_string();
  }
  if let Some(price) = p.price {
    product.price = price;
  }
  if p.clear_discount {
    product.discount_price = None;
  } else if p.discount_price.is_some() {
    product.discount_price = p.discount_price;
  }
  validate_prices(product.price, product.discount_price)?;
  if let Some(images) = p.images {
    product.images = images;
  }
  if let Some(sizes) = p.sizes {
    product.sizes = sizes;
  }
  if let Some(colors) = p.colors {
    product.colors = colors;
  }
  if let Some(tags) = p.tags {
    product.tags = tags;
  }
  if let Some(inventory) = p.inventory {
    product.stock = inventory.total();
    product.inventory = Json(inventory);
  }
  if let Some(category) = clean(p.category) {
    product.category = category;
  }
  if p.age_group.is_some() {
    product.age_group = clean(p.age_group);
  }
  if let Some(status) = p.status {
    product.status = status;
  }

  let updated = sqlx::query_as::<_, Product>(
    "UPDATE products SET name = $2, description = $3, price = $4, discount_price = $5, images = $6, sizes = $7,
       colors = $8, tags = $9, inventory = $10, stock = $11, category = $12, age_group = $13, status = $14,
       updated_at = NOW()
     WHERE id = $1 RETURNING *",
  )
  .bind(product.id)
  .bind(&product.name)
  .bind(&product.description)
  .bind(product.price)
  .bind(product.discount_price)
  .bind(&product.images)
  .bind(&product.sizes)
  .bind(&product.colors)
  .bind(&product.tags)
  .bind(&product.inventory)
  .bind(product.stock)
  .bind(&product.category)
  .bind(&product.age_group)
  .bind(product.status)
  .fetch_one(&mut *tx)
  .await?;
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action: "UPDATE_PRODUCT",
      entity: "Product",
      entity_id: Some(updated.id.to_string()),
      details: format!("Updated product {}", updated.name),
    },
  )
  .await?;
  tx.commit().await?;

  Ok(HttpResponse::Ok().json(updated))
}

/// Products already sold are kept for order history and only hidden.
#[instrument(name = "handler::delete_product", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let product_id = path.into_inner();
  let mut tx = app_state.db_pool.begin().await?;

  let name: String = sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Product"))?;
  let referenced: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM order_items WHERE product_id = $1)")
    .bind(product_id)
    .fetch_one(&mut *tx)
    .await?;

  let (action, message) = if referenced {
    sqlx::query("UPDATE products SET status = 'DELETED', updated_at = NOW() WHERE id = $1")
      .bind(product_id)
      .execute(&mut *tx)
      .await?;
    ("ARCHIVE_PRODUCT", "Product archived (it appears in past orders)")
  } else {
    sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(product_id)
      .execute(&mut *tx)
      .await?;
    ("DELETE_PRODUCT", "Product deleted")
  };
  audit::record(
    &mut *tx,
    AuditEntry {
      admin_id: admin.0.user_id,
      action,
      entity: "Product",
      entity_id: Some(product_id.to_string()),
      details: format!("{message}: {name}"),
    },
  )
  .await?;
  tx.commit().await?;

  info!(%product_id, soft = referenced, "Product removed.");
  Ok(HttpResponse::Ok().json(json!({ "message": message })))
}
