// hopz/src/cart.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most units of one variant a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
  pub product_id: Uuid,
  pub size: String,
  pub color: String,
  pub quantity: i32,
}

impl CartLine {
  pub fn same_variant(&self, other: &CartLine) -> bool {
    self.product_id == other.product_id && self.size == other.size && self.color == other.color
  }
}

/// Folds a guest cart into the stored one. Matching variants have their
/// quantities summed, new variants are appended in guest order. Every line
/// ends up capped at [`MAX_LINE_QUANTITY`].
pub fn merge_guest_cart(server: &[CartLine], guest: &[CartLine]) -> Vec<CartLine> {
  let mut merged = server.to_vec();
  for line in guest.iter().filter(|l| l.quantity > 0) {
    match merged.iter_mut().find(|m| m.same_variant(line)) {
      Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
      None => merged.push(line.clone()),
    }
  }
  for line in merged.iter_mut() {
    line.quantity = line.quantity.min(MAX_LINE_QUANTITY);
  }
  merged
}
