// hopz/src/inventory.rs

//! Per-size stock for a product.

use serde::{Deserialize, Serialize};

pub const DEFAULT_STOCK_PER_SIZE: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock {
  pub size: String,
  pub stock: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(Vec<SizeStock>);

impl Inventory {
  pub fn new(entries: Vec<SizeStock>) -> Self {
    Inventory(entries)
  }

  pub fn default_for<S: AsRef<str>>(sizes: &[S]) -> Self {
    Inventory(
      sizes
        .iter()
        .map(|s| SizeStock {
          size: s.as_ref().to_string(),
          stock: DEFAULT_STOCK_PER_SIZE,
        })
        .collect(),
    )
  }

  pub fn entries(&self) -> &[SizeStock] {
    &self.0
  }

  pub fn stock_for(&self, size: &str) -> Option<i32> {
    self.0.iter().find(|e| e.size == size).map(|e| e.stock)
  }

  /// Takes `qty` units of `size`, bottoming out at zero. Returns false when
  /// the size is not tracked.
  pub fn reserve(&mut self, size: &str, qty: i32) -> bool {
    match self.0.iter_mut().find(|e| e.size == size) {
      Some(entry) => {
        entry.stock = (entry.stock - qty).max(0);
        true
      }
      None => false,
    }
  }

  /// Puts `qty` units of `size` back, adding the size if it was not tracked.
  pub fn restock(&mut self, size: &str, qty: i32) {
    match self.0.iter_mut().find(|e| e.size == size) {
      Some(entry) => entry.stock += qty,
      None => self.0.push(SizeStock {
        size: size.to_string(),
        stock: qty,
      }),
    }
  }

  /// Overwrites the count for `size` after a stock take, adding the size if
  /// it was not tracked. Negative counts are stored as zero.
  pub fn set_stock(&mut self, size: &str, stock: i32) {
    let stock = stock.max(0);
    match self.0.iter_mut().find(|e| e.size == size) {
      Some(entry) => entry.stock = stock,
      None => self.0.push(SizeStock {
        size: size.to_string(),
        stock,
      }),
    }
  }

  pub fn total(&self) -> i32 {
    self.0.iter().map(|e| e.stock.max(0)).sum()
  }
}
