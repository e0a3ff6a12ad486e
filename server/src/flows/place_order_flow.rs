// hopz-server/src/flows/place_order_flow.rs

//! Checkout: price the cart from the catalogue, apply the coupon, write the
//! order with its lines and stock reservations in one transaction.

use crate::errors::{AppError, Result as AppResult};
use crate::flows::common_steps::{self, StockChange};
use crate::flows::contexts::{PlaceOrderCtxData, PricedLine};
use crate::models::{Address, AddressSnapshot, Coupon, Order, OrderItem, Product, ProductStatus};
use crate::services::{mailer, notification_service};
use chrono::Utc;
use hopz::coupon::normalize_code;
use hopz::lifecycle::order::{order_number, StatusHistory, SYSTEM_ACTOR};
use hopz::notify::Draft;
use hopz::pricing::{items_total, OrderTotals};
use hopz::{ContextData, FlowError, Flows, OrderStatus, PaymentMethod, PaymentStatus, Pipeline, PipelineControl};
use sqlx::types::Json;
use tracing::{event, info, warn, Level};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Registers the checkout flow.
///
/// Steps run in order: validate the request, resolve the shipping address,
/// price every line against live catalogue prices, apply an optional coupon,
/// then write the order and reserve stock in one transaction. COD orders are
/// confirmed immediately and announced here; online orders wait for payment.
///
/// # Arguments
/// * `flows`: The registry shared through `AppState`.
///
/// # Returns
/// A `FlowError` if a step name is misspelled or a handler is registered twice.
pub fn register_place_order_flow(flows: &Flows<AppError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<PlaceOrderCtxData, AppError>::new(
    "place_order",
    &[
      ("validate_order_request", false),
      ("resolve_address", false),
      ("price_lines", false),
      ("apply_coupon", true),
      ("persist_order", false),
      ("notify_order_placed", true),
    ],
  );

  p.skip_if("apply_coupon", |c| {
    c.input.coupon_code.as_deref().map(str::trim).unwrap_or_default().is_empty()
  })?;
  // Online orders are announced once payment is verified.
  p.skip_if("notify_order_placed", |c| {
    c.order.as_ref().map(|o| o.status) != Some(OrderStatus::Confirmed)
  })?;

  p.on("validate_order_request", validate_order_request)?;
  p.on("resolve_address", resolve_address)?;
  p.on("price_lines", price_lines)?;
  p.on("apply_coupon", apply_coupon)?;
  p.on("persist_order", persist_order)?;
  p.on("notify_order_placed", notify_order_placed)?;

  flows.register(p);
  info!("Place-order flow registered.");
  Ok(())
}

async fn validate_order_request(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (input, is_guest) = ctx_data.with(|c| (c.input.clone(), c.customer.is_none()));

  if input.items.is_empty() {
    return Err(AppError::Validation("Order must contain at least one item".to_string()));
  }
  if let Some(bad) = input.items.iter().find(|i| i.quantity < 1) {
    return Err(AppError::Validation(format!("Invalid quantity for product {}", bad.product_id)));
  }
  if input.items.iter().any(|i| i.size.trim().is_empty()) {
    return Err(AppError::Validation("Size is required for every item".to_string()));
  }
  if is_guest {
    let email_ok = input.guest_email.as_deref().is_some_and(|e| e.contains('@'));
    let phone_ok = input.guest_phone.as_deref().is_some_and(|p| !p.trim().is_empty());
    if !email_ok || !phone_ok {
      return Err(AppError::Validation("Guest email and phone are required".to_string()));
    }
  }

  let method = PaymentMethod::parse_label(&input.payment_method)?;
  ctx_data.write().payment_method = Some(method);
  Ok(PipelineControl::Continue)
}

async fn resolve_address(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (address_id, inline, customer_id, pool) = ctx_data.with(|c| {
    (
      c.input.address_id,
      c.input.address.clone(),
      c.customer.as_ref().map(|a| a.user_id),
      c.app_state.db_pool.clone(),
    )
  });

  let snapshot = match (address_id, inline) {
    (Some(address_id), _) => {
      let user_id = customer_id.ok_or_else(|| AppError::Validation("Saved addresses require sign-in".to_string()))?;
      let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::not_found("Address"))?;
      AddressSnapshot::from(&address)
    }
    (None, Some(inline)) => inline,
    (None, None) => return Err(AppError::Validation("Delivery address is required".to_string())),
  };
  snapshot.validate().map_err(AppError::Validation)?;

  ctx_data.write().address = Some(snapshot);
  Ok(PipelineControl::Continue)
}

async fn price_lines(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (requested, pool) = ctx_data.with(|c| (c.input.items.clone(), c.app_state.db_pool.clone()));

  let mut lines = Vec::with_capacity(requested.len());
  for item in requested {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
      .bind(item.product_id)
      .fetch_optional(&pool)
      .await?
      .filter(|p| p.status == ProductStatus::Active)
      .ok_or_else(|| AppError::NotFound(format!("Product {} is not available", item.product_id)))?;

    let size = item.size.trim().to_string();
    if !product.sizes.is_empty() && !product.sizes.iter().any(|s| s == &size) {
      return Err(AppError::Validation(format!("Size {size} is not offered for {}", product.name)));
    }
    if let Some(available) = product.inventory.stock_for(&size) {
      if available < item.quantity {
        return Err(AppError::Validation(format!(
          "Only {available} left in size {size} for {}",
          product.name
        )));
      }
    }

    lines.push(PricedLine {
      product_id: product.id,
      name: product.name.clone(),
      unit_price: product.unit_price(),
      quantity: item.quantity,
      size,
      color: item.color.trim().to_string(),
    });
  }

  event!(Level::DEBUG, subtotal = items_total(&lines).paise(), lines = lines.len(), "Lines priced.");
  ctx_data.write().lines = lines;
  Ok(PipelineControl::Continue)
}

async fn apply_coupon(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (raw_code, subtotal, pool) = ctx_data.with(|c| {
    (
      c.input.coupon_code.clone().unwrap_or_default(),
      items_total(&c.lines),
      c.app_state.db_pool.clone(),
    )
  });
  let code = normalize_code(&raw_code)?;

  let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
    .bind(&code)
    .fetch_optional(&pool)
    .await?
    .ok_or(hopz::RuleViolation::CouponInactive)?;
  let discount = coupon.rule().evaluate(subtotal, Utc::now())?;

  info!(%code, discount = discount.paise(), "Coupon applied.");
  {
    let mut guard = ctx_data.write();
    guard.coupon = Some(coupon);
    guard.coupon_discount = discount;
  }
  Ok(PipelineControl::Continue)
}

async fn persist_order(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (state, customer, input, method, address, lines, coupon, discount) = ctx_data.with(|c| {
    (
      c.app_state.clone(),
      c.customer.clone(),
      c.input.clone(),
      c.payment_method,
      c.address.clone(),
      c.lines.clone(),
      c.coupon.clone(),
      c.coupon_discount,
    )
  });
  let method = method.ok_or_else(|| AppError::Internal("Payment method not resolved".to_string()))?;
  let address = address.ok_or_else(|| AppError::Internal("Address not resolved".to_string()))?;

  let totals = OrderTotals::compute(&lines, discount, state.config.shipping);
  let status = OrderStatus::initial_for(method);
  let now = Utc::now();
  let actor = customer.as_ref().map(|a| a.history_label()).unwrap_or_else(|| SYSTEM_ACTOR.to_string());
  let mut history = StatusHistory::new();
  history.record(status, actor, Some("Order placed".to_string()), now);

  let mut tx = state.db_pool.begin().await?;

  let mut number = None;
  for _ in 0..ORDER_NUMBER_ATTEMPTS {
    let candidate = order_number::generate(now.date_naive());
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
      .bind(&candidate)
      .fetch_one(&mut *tx)
      .await?;
    if !taken {
      number = Some(candidate);
      break;
    }
  }
  let number = number.ok_or_else(|| AppError::Internal("Could not allocate an order number".to_string()))?;

  let order = sqlx::query_as::<_, Order>(
    "INSERT INTO orders (order_number, user_id, guest_email, guest_name, guest_phone, address, status,
       payment_method, payment_status, subtotal, discount, shipping, tax, total, coupon_code, status_history)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
     RETURNING *",
  )
  .bind(&number)
  .bind(customer.as_ref().map(|a| a.user_id))
  .bind(input.guest_email.as_deref().map(str::trim))
  .bind(input.guest_name.as_deref().map(str::trim))
  .bind(input.guest_phone.as_deref().map(str::trim))
  .bind(Json(&address))
  .bind(status)
  .bind(method)
  .bind(PaymentStatus::Pending)
  .bind(totals.subtotal)
  .bind(totals.discount)
  .bind(totals.shipping)
  .bind(totals.tax)
  .bind(totals.total)
  .bind(coupon.as_ref().map(|c| c.code.clone()))
  .bind(Json(&history))
  .fetch_one(&mut *tx)
  .await?;

  let mut items = Vec::with_capacity(lines.len());
  for line in &lines {
    let item = sqlx::query_as::<_, OrderItem>(
      "INSERT INTO order_items (order_id, product_id, name, price, quantity, size, color)
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(order.id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(line.unit_price)
    .bind(line.quantity)
    .bind(&line.size)
    .bind(&line.color)
    .fetch_one(&mut *tx)
    .await?;
    common_steps::adjust_stock(&mut tx, line.product_id, &line.size, line.quantity, StockChange::Reserve).await?;
    items.push(item);
  }

  if let Some(customer) = &customer {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(customer.user_id)
      .execute(&mut *tx)
      .await?;
  }
  if let Some(coupon) = &coupon {
    sqlx::query("UPDATE coupons SET current_uses = current_uses + 1 WHERE id = $1")
      .bind(coupon.id)
      .execute(&mut *tx)
      .await?;
  }

  tx.commit().await?;
  info!(order_id = %order.id, order_number = %order.order_number, total = order.total.paise(), "Order placed.");

  {
    let mut guard = ctx_data.write();
    guard.totals = Some(totals);
    guard.order = Some(order);
    guard.items = items;
  }
  Ok(PipelineControl::Continue)
}

async fn notify_order_placed(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (state, order, customer) = ctx_data.with(|c| (c.app_state.clone(), c.order.clone(), c.customer.clone()));
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  announce_confirmed_order(&state, &order, customer.as_ref().map(|c| c.email.as_str())).await;
  Ok(PipelineControl::Continue)
}

/// Admin alert, customer notification and confirmation mail for a newly confirmed order.
/// Shared with payment verification, which confirms online orders.
pub async fn announce_confirmed_order(state: &crate::state::AppState, order: &Order, account_email: Option<&str>) {
  let account_name = match order.user_id {
    Some(user_id) => common_steps::account_name(&state.db_pool, user_id).await.unwrap_or_else(|e| {
      warn!(error = %e, "Could not load customer name for notification.");
      None
    }),
    None => None,
  };
  let customer = order.customer_label(account_name.as_deref());
  notification_service::dispatch(
    &state.db_pool,
    &state.config,
    Draft::new_order(&order.order_number, &customer, order.total),
  )
  .await;

  if let Some(user_id) = order.user_id {
    notification_service::dispatch(
      &state.db_pool,
      &state.config,
      Draft::order_status(user_id, &order.order_number, OrderStatus::Confirmed),
    )
    .await;
  }

  let recipient = account_email.map(str::to_string).or_else(|| order.guest_email.clone());
  if let Some(to) = recipient {
    let subject = format!("Order Confirmed - #{}", order.order_number);
    let body = format!(
      "<p>Hi {customer},</p><p>Thank you for shopping with Happy Hopz! Your order <b>#{}</b> for {} is confirmed.</p>",
      order.order_number, order.total
    );
    if let Err(e) = mailer::send_mock_email(&to, &state.config.mail_sender, &subject, &body).await {
      warn!(error = %e, "Order confirmation mail failed.");
    }
  }
}
