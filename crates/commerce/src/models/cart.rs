//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karavan_core::{CartLineId, Price, ProductId, UserId};

use super::product::Product;

/// A cart line as persisted.
///
/// At most one line exists per `(user_id, product_id)` pair; quantity is
/// always at least 1. A line that would reach zero is deleted instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart line ID.
    pub id: CartLineId,
    /// Owner of the cart.
    pub user_id: UserId,
    /// Product the line references.
    pub product_id: ProductId,
    /// Units of the product in the cart.
    pub quantity: i64,
    /// When the line was first created.
    pub created_at: DateTime<Utc>,
    /// When the quantity last changed.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of decrementing a cart line.
#[derive(Debug, Clone, PartialEq)]
pub enum CartLineChange {
    /// Quantity went down; the line is still in the cart.
    Updated(CartLine),
    /// Quantity hit the floor and the line was deleted.
    Removed,
    /// The line no longer exists (e.g., removed by a concurrent request).
    Missing,
}

// =============================================================================
// View Types
// =============================================================================

/// A cart line joined with its catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineView {
    /// The persisted line.
    pub line: CartLine,
    /// The product it references.
    pub product: Product,
}

impl CartLineView {
    /// Price of this line at the product's current catalog price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.line.quantity)
    }
}

/// A user's cart joined with the catalog, newest line first.
///
/// Lines whose product has since left the catalog are not included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartView {
    /// Joined cart lines.
    pub lines: Vec<CartLineView>,
}

impl CartView {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.line.quantity).sum()
    }

    /// Sum of line totals at current catalog prices.
    ///
    /// Returns `None` if the lines mix currencies; an empty cart totals zero
    /// in the default currency.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        Price::sum(self.lines.iter().map(CartLineView::line_total))
    }
}
