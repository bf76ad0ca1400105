//! Cart staging operations.
//!
//! All quantity changes are single atomic conditional updates at the storage
//! layer, so concurrent requests from multiple tabs or devices cannot lose
//! updates. Every mutation is scoped to the calling user's own lines.

use tracing::{debug, info, instrument, warn};

use karavan_core::{CartLineId, ProductId};

use crate::caller::Caller;
use crate::error::{CommerceError, NotFound};
use crate::models::{CartLine, CartLineChange, CartLineView, CartView};
use crate::store::Store;

use super::catalog_by_ids;

/// Request to put a product in the cart.
#[derive(Debug, Clone)]
pub struct AddToCart {
    /// Product to add.
    pub product_id: ProductId,
    /// Units to add; values below 1 are coerced to 1.
    pub quantity: i64,
}

impl AddToCart {
    /// One unit of a product.
    #[must_use]
    pub const fn one(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: 1,
        }
    }
}

/// Cart operations, scoped to the calling user.
pub struct CartService<'a> {
    store: &'a Store,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Add a product to the caller's cart, or raise the existing line.
    ///
    /// The store performs a single atomic increment-or-insert keyed by
    /// (user, product), so two concurrent adds collapse onto one line rather
    /// than both passing an existence check and both inserting.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product is not in the
    /// catalog. Returns `CommerceError::Store` if the store fails.
    #[instrument(
        skip(self, caller, request),
        fields(user_id = %caller.user_id(), product_id = %request.product_id)
    )]
    pub async fn add_or_increment(
        &self,
        caller: &Caller,
        request: AddToCart,
    ) -> Result<CartLine, CommerceError> {
        let quantity = request.quantity.max(1);
        if quantity != request.quantity {
            warn!(requested = request.quantity, "coerced non-positive quantity to 1");
        }

        let product = self
            .store
            .backend()
            .product_by_id(request.product_id)
            .await?
            .ok_or(NotFound::Product(request.product_id))?;

        let line = self
            .store
            .backend()
            .upsert_cart_line(caller.user_id(), product.id, quantity)
            .await?;

        info!(line_id = %line.id, quantity = line.quantity, "added product to cart");
        Ok(line)
    }

    /// Raise a line's quantity by one.
    ///
    /// Scoped to the caller's own lines; a line the caller does not own is
    /// indistinguishable from one that does not exist. A missing line is a
    /// no-op, reported as `None` so displays can refresh.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id(), line_id = %line_id))]
    pub async fn increment(
        &self,
        caller: &Caller,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, CommerceError> {
        let line = self
            .store
            .backend()
            .increment_cart_line(caller.user_id(), line_id)
            .await?;

        match &line {
            Some(line) => debug!(quantity = line.quantity, "incremented cart line"),
            None => debug!("increment on a missing line; nothing to do"),
        }
        Ok(line)
    }

    /// Lower a line's quantity by one, deleting it at the floor.
    ///
    /// A line at quantity 1 is deleted instead of storing zero. Like
    /// [`increment`](Self::increment), a missing line (including one removed
    /// by a concurrent request) is a no-op outcome.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id(), line_id = %line_id))]
    pub async fn decrement(
        &self,
        caller: &Caller,
        line_id: CartLineId,
    ) -> Result<CartLineChange, CommerceError> {
        let change = self
            .store
            .backend()
            .decrement_cart_line(caller.user_id(), line_id)
            .await?;

        match &change {
            CartLineChange::Updated(line) => {
                debug!(quantity = line.quantity, "decremented cart line");
            }
            CartLineChange::Removed => debug!("decrement hit the floor; line removed"),
            CartLineChange::Missing => debug!("decrement on a missing line; nothing to do"),
        }
        Ok(change)
    }

    /// Delete a line outright, whatever its quantity.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the caller owns no such line.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id(), line_id = %line_id))]
    pub async fn remove(&self, caller: &Caller, line_id: CartLineId) -> Result<(), CommerceError> {
        let removed = self
            .store
            .backend()
            .delete_cart_line(caller.user_id(), line_id)
            .await?;

        if !removed {
            return Err(NotFound::CartLine(line_id).into());
        }

        info!("removed cart line");
        Ok(())
    }

    /// The caller's cart joined with the current catalog, newest line first.
    ///
    /// Lines whose product has left the catalog are excluded rather than
    /// shown stale.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()))]
    pub async fn list(&self, caller: &Caller) -> Result<CartView, CommerceError> {
        let lines = self.store.backend().cart_lines(caller.user_id()).await?;
        if lines.is_empty() {
            return Ok(CartView::empty());
        }

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let catalog = catalog_by_ids(self.store, &ids).await?;

        let views = lines
            .into_iter()
            .filter_map(|line| {
                let product = catalog.get(&line.product_id).cloned()?;
                Some(CartLineView { line, product })
            })
            .collect();

        let view = CartView { lines: views };
        debug!(lines = view.lines.len(), items = view.item_count(), "listed cart");
        Ok(view)
    }

    /// Empty the caller's cart, returning how many lines were deleted.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()))]
    pub async fn clear(&self, caller: &Caller) -> Result<u64, CommerceError> {
        let deleted = self.store.backend().clear_cart(caller.user_id()).await?;
        info!(lines = deleted, "cleared cart");
        Ok(deleted)
    }
}
