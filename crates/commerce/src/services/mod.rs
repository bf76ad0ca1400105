//! Commerce services.
//!
//! Each service borrows the [`Store`] handle and covers one slice of the
//! domain: caller resolution and profile sync, cart staging, checkout, order
//! lifecycle, and favorites. Every operation takes a
//! [`Caller`](crate::Caller) resolved by [`IdentityService`]; ownership
//! scoping and privilege checks happen here, before any store access.

mod cart;
mod checkout;
mod favorite;
mod identity;
mod order;

pub use cart::{AddToCart, CartService};
pub use checkout::{CheckoutService, PlaceOrder};
pub use favorite::FavoriteService;
pub use identity::IdentityService;
pub use order::OrderService;

use std::collections::HashMap;

use karavan_core::ProductId;

use crate::error::StoreError;
use crate::models::Product;
use crate::store::Store;

/// Fetch catalog entries for a set of product ids, keyed for joining.
///
/// Read-side joins tolerate delisted products, so ids that resolve to
/// nothing are simply absent from the map.
pub(crate) async fn catalog_by_ids(
    store: &Store,
    ids: &[ProductId],
) -> Result<HashMap<ProductId, Product>, StoreError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let products = store.backend().products_by_ids(ids).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}
