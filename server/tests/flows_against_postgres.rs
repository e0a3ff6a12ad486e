// hopz-server/tests/flows_against_postgres.rs

//! Order, return and payment flows against a real Postgres. Each test
//! creates its own database under the server named by `DATABASE_URL` and
//! runs the migrations into it; without that variable the tests return
//! early so the suite still passes on machines with no database.

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use hopz_server::models::Role;
use hopz_server::services::{auth_service, payment_gateway};
use hopz_server::{AppConfig, AppState};
use serde_json::{json, Value};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Executor, PgPool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &str = "integration-test-token-secret";
const GATEWAY_SECRET: &str = "mock_payment_secret";

async fn fresh_state() -> Option<AppState> {
  let Ok(url) = std::env::var("DATABASE_URL") else {
    eprintln!("DATABASE_URL not set; skipping database-backed flow test");
    return None;
  };
  let server = PgConnectOptions::from_str(&url).expect("DATABASE_URL");
  let name = format!("hopz_test_{}", Uuid::new_v4().simple());
  let mut admin = server.connect().await.expect("connect to DATABASE_URL");
  admin
    .execute(format!("CREATE DATABASE {name}").as_str())
    .await
    .expect("create test database");

  let pool = PgPoolOptions::new()
    .max_connections(8)
    .connect_with(server.clone().database(&name))
    .await
    .expect("connect to test database");
  sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

  let config = AppConfig::from_lookup(|key| match key {
    "DATABASE_URL" => Some(url.clone()),
    "TOKEN_SECRET" => Some(SECRET.to_string()),
    _ => None,
  })
  .expect("config");
  Some(AppState::build(pool, Arc::new(config)).expect("flows register"))
}

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(hopz_server::web::configure_app_routes),
    )
    .await
  };
}

macro_rules! send {
  ($app:expr, $req:expr) => {{
    let resp = test::call_service(&$app, $req.to_request()).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
  }};
}

struct Shopper {
  id: Uuid,
  token: String,
}

async fn seed_user(pool: &PgPool, email: &str, role: Role) -> Shopper {
  let id: Uuid = sqlx::query_scalar(
    "INSERT INTO users (email, password_hash, name, phone, role, is_verified)
     VALUES ($1, 'unused', 'Asha Menon', '9876543210', $2, TRUE) RETURNING id",
  )
  .bind(email)
  .bind(role)
  .fetch_one(pool)
  .await
  .expect("seed user");
  let token = auth_service::issue_token(SECRET, id, email, role, 1).expect("token");
  Shopper { id, token }
}

/// Ten pairs of size 7C at ₹999.
async fn seed_product(pool: &PgPool) -> Uuid {
  sqlx::query_scalar(
    "INSERT INTO products (name, price, sizes, colors, inventory, stock, category)
     VALUES ('Bunny Hop Sneakers', 99900, $1, $2, $3, 10, 'Sneakers') RETURNING id",
  )
  .bind(vec!["7C".to_string()])
  .bind(vec!["Pink".to_string()])
  .bind(json!([{ "size": "7C", "stock": 10 }]))
  .fetch_one(pool)
  .await
  .expect("seed product")
}

async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
  sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_one(pool)
    .await
    .expect("stock")
}

fn bearer(token: &str) -> (header::HeaderName, String) {
  (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn order_body(product_id: Uuid, quantity: i32, payment_method: &str) -> Value {
  json!({
    "items": [{ "product_id": product_id, "quantity": quantity, "size": "7C", "color": "Pink" }],
    "address": {
      "name": "Asha Menon",
      "phone": "9876543210",
      "line1": "12 MG Road",
      "city": "Bengaluru",
      "state": "Karnataka",
      "pincode": "560001"
    },
    "payment_method": payment_method,
    "guest_email": "asha.menon@hopz.in",
    "guest_name": "Asha Menon",
    "guest_phone": "9876543210"
  })
}

#[actix_web::test]
async fn cancelling_a_cod_order_puts_the_pairs_back() {
  let Some(state) = fresh_state().await else { return };
  let pool = state.db_pool.clone();
  let shopper = seed_user(&pool, "asha.menon@hopz.in", Role::User).await;
  let product = seed_product(&pool).await;
  let app = app!(state);

  let (status, order) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&shopper.token))
      .set_json(order_body(product, 2, "COD"))
  );
  assert_eq!(status, StatusCode::CREATED, "{order}");
  assert_eq!(order["status"], "CONFIRMED");
  assert_eq!(order["user_id"], shopper.id.to_string());
  assert_eq!(stock_of(&pool, product).await, 8);

  let (status, body) = send!(
    app,
    test::TestRequest::patch()
      .uri(&format!("/api/orders/{}/cancel", order["id"].as_str().unwrap()))
      .insert_header(bearer(&shopper.token))
      .set_json(json!({ "reason": "Ordered the wrong size" }))
  );
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["order"]["status"], "CANCELLED");
  assert_eq!(body["order"]["cancellation_reason"], "Ordered the wrong size");
  assert_eq!(stock_of(&pool, product).await, 10);
}

#[actix_web::test]
async fn simultaneous_cancels_restock_once() {
  let Some(state) = fresh_state().await else { return };
  let pool = state.db_pool.clone();
  let shopper = seed_user(&pool, "asha.menon@hopz.in", Role::User).await;
  let product = seed_product(&pool).await;
  let app = app!(state);

  let (_, order) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&shopper.token))
      .set_json(order_body(product, 3, "COD"))
  );
  let order_id = order["id"].as_str().unwrap().to_string();
  assert_eq!(stock_of(&pool, product).await, 7);

  let cancel = || {
    test::TestRequest::patch()
      .uri(&format!("/api/orders/{order_id}/cancel"))
      .insert_header(bearer(&shopper.token))
      .to_request()
  };
  let (first, second) = futures_util::join!(test::call_service(&app, cancel()), test::call_service(&app, cancel()));
  let mut statuses = [first.status(), second.status()];
  statuses.sort();
  assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
  assert_eq!(stock_of(&pool, product).await, 10);

  let history: Value = sqlx::query_scalar("SELECT status_history FROM orders WHERE id = $1::uuid")
    .bind(&order_id)
    .fetch_one(&pool)
    .await
    .expect("history");
  let cancellations = history
    .as_array()
    .expect("history array")
    .iter()
    .filter(|entry| entry["status"] == "CANCELLED")
    .count();
  assert_eq!(cancellations, 1);
}

#[actix_web::test]
async fn shipped_orders_cannot_be_cancelled_by_the_customer() {
  let Some(state) = fresh_state().await else { return };
  let pool = state.db_pool.clone();
  let shopper = seed_user(&pool, "asha.menon@hopz.in", Role::User).await;
  let owner = seed_user(&pool, "owner@hopz.in", Role::Admin).await;
  let product = seed_product(&pool).await;
  let app = app!(state);

  let (_, order) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&shopper.token))
      .set_json(order_body(product, 1, "COD"))
  );
  let order_id = order["id"].as_str().unwrap().to_string();

  let (status, shipped) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/orders/{order_id}/status"))
      .insert_header(bearer(&owner.token))
      .set_json(json!({ "status": "SHIPPED", "tracking_number": "DL123", "courier_partner": "Delhivery" }))
  );
  assert_eq!(status, StatusCode::OK, "{shipped}");
  assert_eq!(shipped["status"], "SHIPPED");

  // Same status again is answered with the order unchanged.
  let (status, again) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/orders/{order_id}/status"))
      .insert_header(bearer(&owner.token))
      .set_json(json!({ "status": "SHIPPED" }))
  );
  assert_eq!(status, StatusCode::OK, "{again}");
  assert_eq!(again["status_history"].as_array().map(Vec::len), shipped["status_history"].as_array().map(Vec::len));

  let (status, _) = send!(
    app,
    test::TestRequest::patch()
      .uri(&format!("/api/orders/{order_id}/cancel"))
      .insert_header(bearer(&shopper.token))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(stock_of(&pool, product).await, 9);
}

#[actix_web::test]
async fn completed_return_records_the_refund_and_restocks() {
  let Some(state) = fresh_state().await else { return };
  let pool = state.db_pool.clone();
  let shopper = seed_user(&pool, "asha.menon@hopz.in", Role::User).await;
  let owner = seed_user(&pool, "owner@hopz.in", Role::Admin).await;
  let product = seed_product(&pool).await;
  let app = app!(state);

  let (_, order) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&shopper.token))
      .set_json(order_body(product, 1, "COD"))
  );
  let order_id = order["id"].as_str().unwrap().to_string();
  let order_item_id = order["items"][0]["id"].as_str().unwrap().to_string();
  let (status, delivered) = send!(
    app,
    test::TestRequest::put()
      .uri(&format!("/api/orders/{order_id}/status"))
      .insert_header(bearer(&owner.token))
      .set_json(json!({ "status": "DELIVERED" }))
  );
  assert_eq!(status, StatusCode::OK, "{delivered}");
  assert_eq!(stock_of(&pool, product).await, 9);

  let request = json!({
    "order_id": order_id,
    "type": "RETURN",
    "items": [{ "order_item_id": order_item_id, "quantity": 1, "reason": "Too small" }]
  });
  let (status, created) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/returns/create")
      .insert_header(bearer(&shopper.token))
      .set_json(&request)
  );
  assert_eq!(status, StatusCode::CREATED, "{created}");
  let return_id = created["return_request"]["id"].as_str().unwrap().to_string();

  let (status, _) = send!(
    app,
    test::TestRequest::post()
      .uri("/api/returns/create")
      .insert_header(bearer(&shopper.token))
      .set_json(&request)
  );
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, approved) = send!(
    app,
    test::TestRequest::patch()
      .uri(&format!("/api/admin/returns/{return_id}/approve"))
      .insert_header(bearer(&owner.token))
      .set_json(json!({ "admin_notes": "Pickup on Monday" }))
  );
  assert_eq!(status, StatusCode::OK, "{approved}");
  assert_eq!(approved["return_request"]["status"], "APPROVED");

  let complete = || {
    test::TestRequest::patch()
      .uri(&format!("/api/admin/returns/{return_id}/complete"))
      .insert_header(bearer(&owner.token))
      .set_json(json!({ "refund_method": "ORIGINAL", "restock_items": true }))
      .to_request()
  };
  let (first, second) = futures_util::join!(test::call_service(&app, complete()), test::call_service(&app, complete()));
  let mut statuses = [first.status(), second.status()];
  statuses.sort();
  assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

  let (status, refund_status, refund_amount, processed): (String, Option<String>, Option<i64>, bool) = sqlx::query_as(
    "SELECT status::text, refund_status::text, refund_amount, processed_at IS NOT NULL
     FROM return_requests WHERE id = $1::uuid",
  )
  .bind(&return_id)
  .fetch_one(&pool)
  .await
  .expect("return row");
  assert_eq!(status, "COMPLETED");
  assert_eq!(refund_status.as_deref(), Some("PROCESSED"));
  assert!(refund_amount.is_some());
  assert!(processed);
  assert_eq!(stock_of(&pool, product).await, 10);
}

#[actix_web::test]
async fn a_signature_for_one_order_cannot_pay_for_another() {
  let Some(state) = fresh_state().await else { return };
  let pool = state.db_pool.clone();
  let product = seed_product(&pool).await;
  let app = app!(state);

  let mut orders = Vec::new();
  for _ in 0..2 {
    let (status, order) = send!(
      app,
      test::TestRequest::post()
        .uri("/api/orders")
        .set_json(order_body(product, 1, "ONLINE"))
    );
    assert_eq!(status, StatusCode::CREATED, "{order}");
    let order_id = order["id"].as_str().unwrap().to_string();
    let (status, intent) = send!(
      app,
      test::TestRequest::post()
        .uri("/api/payment/intent")
        .set_json(json!({ "order_id": order_id }))
    );
    assert_eq!(status, StatusCode::OK, "{intent}");
    orders.push((order_id, intent["id"].as_str().unwrap().to_string()));
  }
  let (paid_for, paid_gateway) = &orders[0];
  let (target, target_gateway) = &orders[1];

  let signature = payment_gateway::sign_checkout(GATEWAY_SECRET, paid_gateway, "pay_replayed").expect("sign");
  let (status, _) = send!(
    app,
    test::TestRequest::post().uri("/api/payment/verify").set_json(json!({
      "order_id": target,
      "gateway_order_id": paid_gateway,
      "gateway_payment_id": "pay_replayed",
      "signature": signature,
    }))
  );
  assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

  let (payment_status, gateway_order_id): (String, Option<String>) =
    sqlx::query_as("SELECT payment_status::text, gateway_order_id FROM orders WHERE id = $1::uuid")
      .bind(target)
      .fetch_one(&pool)
      .await
      .expect("target order");
  assert_eq!(payment_status, "PENDING");
  assert_eq!(gateway_order_id.as_deref(), Some(target_gateway.as_str()));

  // The same signature still settles the order it was issued for.
  let (status, body) = send!(
    app,
    test::TestRequest::post().uri("/api/payment/verify").set_json(json!({
      "order_id": paid_for,
      "gateway_order_id": paid_gateway,
      "gateway_payment_id": "pay_replayed",
      "signature": signature,
    }))
  );
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["order"]["payment_status"], "COMPLETED");
}
