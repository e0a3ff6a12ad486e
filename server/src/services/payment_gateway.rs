// hopz-server/src/services/payment_gateway.rs

//! Simulated payment gateway: order creation, checkout signature checks and refunds.

use crate::errors::{AppError, Result as AppResult};
use hmac::{Hmac, Mac};
use hopz::pricing::Money;
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrder {
  pub id: String,
  pub amount: Money,
  pub currency: &'static str,
  pub receipt: String,
}

#[instrument(name = "payment_gateway::create_order", skip_all, fields(receipt = %receipt, amount = amount.paise()))]
pub async fn create_gateway_order(receipt: &str, amount: Money) -> AppResult<GatewayOrder> {
  if amount <= Money::ZERO {
    return Err(AppError::Payment("Amount must be greater than zero".to_string()));
  }
  tokio::time::sleep(std::time::Duration::from_millis(10)).await;

  let id = format!("order_{}", Uuid::new_v4().simple());
  info!(gateway_order_id = %id, "Mock gateway order created.");
  Ok(GatewayOrder {
    id,
    amount,
    currency: "INR",
    receipt: receipt.to_string(),
  })
}

/// Hex HMAC-SHA256 of `gateway_order_id|gateway_payment_id`, the value the
/// checkout widget hands back.
pub fn sign_checkout(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> AppResult<String> {
  let mut mac =
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Internal(format!("Payment key rejected: {e}")))?;
  mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
  Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_checkout_signature(
  secret: &str,
  gateway_order_id: &str,
  gateway_payment_id: &str,
  signature: &str,
) -> AppResult<()> {
  let provided = hex::decode(signature.trim()).map_err(|_| AppError::Payment("Invalid payment signature".to_string()))?;
  let mut mac =
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Internal(format!("Payment key rejected: {e}")))?;
  mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
  mac
    .verify_slice(&provided)
    .map_err(|_| AppError::Payment("Invalid payment signature".to_string()))
}

#[instrument(name = "payment_gateway::refund", skip_all, fields(transaction_id = %transaction_id, amount = amount.paise()))]
pub async fn request_refund(transaction_id: &str, amount: Money) -> AppResult<String> {
  tokio::time::sleep(std::time::Duration::from_millis(10)).await;
  let refund_id = format!("rfnd_{}", Uuid::new_v4().simple());
  info!(%refund_id, "Mock refund requested.");
  Ok(refund_id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signature_matches_only_for_same_pair() {
    let sig = sign_checkout("key", "order_1", "pay_1").unwrap();
    assert_eq!(sig.len(), 64);
    assert!(verify_checkout_signature("key", "order_1", "pay_1", &sig).is_ok());
    assert!(verify_checkout_signature("key", "order_1", "pay_2", &sig).is_err());
    assert!(verify_checkout_signature("other", "order_1", "pay_1", &sig).is_err());
    assert!(matches!(
      verify_checkout_signature("key", "order_1", "pay_1", "zz"),
      Err(AppError::Payment(_))
    ));
  }

  #[tokio::test]
  async fn zero_amount_orders_are_refused() {
    assert!(create_gateway_order("HHZ-20240101-AAAA", Money::ZERO).await.is_err());
    let order = create_gateway_order("HHZ-20240101-AAAA", Money::from_rupees(998)).await.unwrap();
    assert_eq!(order.currency, "INR");
    assert!(order.id.starts_with("order_"));
  }
}
