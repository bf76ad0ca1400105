//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karavan_core::{OrderId, OrderStatus, Price, ProductId, UserId};

use super::product::Product;

/// A line captured at checkout, exactly as the caller submitted it.
///
/// Items carry no price: an order references the catalog, and displays use
/// whatever the product costs at read time. Changing that is a known gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product the item references.
    pub product_id: ProductId,
    /// Units ordered.
    pub quantity: i64,
}

/// An order as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// User the order belongs to.
    pub user_id: UserId,
    /// Items captured at checkout.
    pub items: Vec<OrderItem>,
    /// Recipient name, as entered.
    pub full_name: String,
    /// Free-form delivery location, as entered.
    pub location: String,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input assembled by checkout for the store.
///
/// The store persists this verbatim with status `pending` and a fresh id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// User placing the order.
    pub user_id: UserId,
    /// Items to capture.
    pub items: Vec<OrderItem>,
    /// Recipient name.
    pub full_name: String,
    /// Delivery location.
    pub location: String,
}

// =============================================================================
// View Types
// =============================================================================

/// An order item joined with today's catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemView {
    /// Product the item references.
    pub product_id: ProductId,
    /// Units ordered.
    pub quantity: i64,
    /// The catalog product, `None` when it has since been deleted.
    pub product: Option<Product>,
}

impl OrderItemView {
    /// Price of this item at the current catalog price, when still listed.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.product.as_ref().map(|p| p.price.times(self.quantity))
    }
}

/// An order joined with the catalog for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    /// The persisted order.
    pub order: Order,
    /// Items joined with the catalog, in capture order.
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    /// Sum of line totals for items still in the catalog.
    ///
    /// Delisted items contribute nothing. Returns `None` when the priced
    /// items mix currencies.
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        Price::sum(self.items.iter().filter_map(OrderItemView::line_total))
    }
}

/// An order joined with the catalog and the customer who placed it.
///
/// The operator view: same projection as [`OrderView`] plus the resolved
/// user record for name/email columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderView {
    /// The order with its catalog join.
    pub view: OrderView,
    /// The user who placed the order.
    pub customer: super::User,
}
