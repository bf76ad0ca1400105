//! Checkout: turning a cart snapshot into an order.

use tracing::{info, instrument, warn};

use crate::caller::Caller;
use crate::error::CommerceError;
use crate::models::{NewOrder, OrderItem, OrderView};
use crate::store::Store;

/// Request to place an order.
///
/// `items` is the snapshot the caller commits to; checkout trusts it rather
/// than re-reading the cart. The cart is a staging area, the order is the
/// commitment.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// Items to capture, usually the cart's current contents.
    pub items: Vec<OrderItem>,
    /// Recipient name.
    pub full_name: String,
    /// Free-form delivery location.
    pub location: String,
}

/// Order creation.
pub struct CheckoutService<'a> {
    store: &'a Store,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Place an order and clear the caller's cart.
    ///
    /// Items are captured verbatim with status `pending`; no price is frozen
    /// in, displays resolve items against the catalog at read time. The
    /// order insert and the cart clear share one store atomicity unit, so a
    /// failure leaves the cart untouched and no order behind.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Validation` if the name or location is blank
    /// after trimming, the item list is empty, or any quantity is below 1.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(
        skip(self, caller, request),
        fields(user_id = %caller.user_id(), items = request.items.len())
    )]
    pub async fn create_order(
        &self,
        caller: &Caller,
        request: PlaceOrder,
    ) -> Result<OrderView, CommerceError> {
        validate(&request)?;

        let order = self
            .store
            .backend()
            .create_order_clearing_cart(&NewOrder {
                user_id: caller.user_id(),
                items: request.items,
                full_name: request.full_name,
                location: request.location,
            })
            .await?;

        info!(order_id = %order.id, "order created; cart cleared");
        super::order::order_view(self.store, order).await
    }
}

fn validate(request: &PlaceOrder) -> Result<(), CommerceError> {
    if request.full_name.trim().is_empty() {
        warn!("rejected order with a blank recipient name");
        return Err(CommerceError::Validation(
            "recipient name must not be blank".to_owned(),
        ));
    }
    if request.location.trim().is_empty() {
        warn!("rejected order with a blank delivery location");
        return Err(CommerceError::Validation(
            "delivery location must not be blank".to_owned(),
        ));
    }
    if request.items.is_empty() {
        warn!("rejected order with no items");
        return Err(CommerceError::Validation(
            "order must contain at least one item".to_owned(),
        ));
    }
    if request.items.iter().any(|item| item.quantity < 1) {
        warn!("rejected order with a non-positive item quantity");
        return Err(CommerceError::Validation(
            "item quantities must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use karavan_core::{CurrencyCode, ExternalUserId, OrderStatus, Price, ProductId};

    use crate::models::{NewProduct, UserProfile};
    use crate::services::{AddToCart, CartService, IdentityService};
    use crate::store::MemoryStore;

    use super::*;

    async fn caller_for(store: &Store, external_id: &str) -> Caller {
        IdentityService::new(store)
            .sync_profile(&UserProfile::bare(ExternalUserId::new(external_id)))
            .await
            .unwrap()
    }

    async fn seed_product(store: &Store, cents: i64) -> ProductId {
        store
            .insert_product(&NewProduct {
                title: "Field Notebook".to_owned(),
                description: "Pocket sized.".to_owned(),
                price: Price::from_cents(cents, CurrencyCode::USD),
                images: vec![],
            })
            .await
            .unwrap()
            .id
    }

    fn order_of(product_id: ProductId, quantity: i64) -> PlaceOrder {
        PlaceOrder {
            items: vec![OrderItem {
                product_id,
                quantity,
            }],
            full_name: "Jane Doe".to_owned(),
            location: "Tashkent".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_order_rejects_blank_name() {
        let store = Store::in_memory();
        let caller = caller_for(&store, "user_a").await;
        let product_id = seed_product(&store, 1000).await;

        let mut request = order_of(product_id, 1);
        request.full_name = "   ".to_owned();

        let err = CheckoutService::new(&store)
            .create_order(&caller, request)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_order_rejects_blank_location() {
        let store = Store::in_memory();
        let caller = caller_for(&store, "user_a").await;
        let product_id = seed_product(&store, 1000).await;

        let mut request = order_of(product_id, 1);
        request.location = String::new();

        let err = CheckoutService::new(&store)
            .create_order(&caller, request)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_items() {
        let store = Store::in_memory();
        let caller = caller_for(&store, "user_a").await;

        let request = PlaceOrder {
            items: vec![],
            full_name: "Jane Doe".to_owned(),
            location: "Tashkent".to_owned(),
        };

        let err = CheckoutService::new(&store)
            .create_order(&caller, request)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_order_rejects_non_positive_quantity() {
        let store = Store::in_memory();
        let caller = caller_for(&store, "user_a").await;
        let product_id = seed_product(&store, 1000).await;

        let err = CheckoutService::new(&store)
            .create_order(&caller, order_of(product_id, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_order_captures_items_and_clears_cart() {
        let store = Store::in_memory();
        let caller = caller_for(&store, "user_a").await;
        let product_id = seed_product(&store, 1000).await;
        let cart = CartService::new(&store);

        cart.add_or_increment(&caller, AddToCart::one(product_id))
            .await
            .unwrap();
        cart.add_or_increment(&caller, AddToCart::one(product_id))
            .await
            .unwrap();

        let view = CheckoutService::new(&store)
            .create_order(&caller, order_of(product_id, 2))
            .await
            .unwrap();

        assert_eq!(view.order.status, OrderStatus::Pending);
        assert_eq!(view.order.full_name, "Jane Doe");
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items.first().unwrap().quantity, 2);
        assert_eq!(
            view.total(),
            Some(Price::from_cents(2000, CurrencyCode::USD))
        );

        assert!(cart.list(&caller).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_the_cart_alone() {
        let store = Store::in_memory();
        let caller = caller_for(&store, "user_a").await;
        let product_id = seed_product(&store, 1000).await;
        let cart = CartService::new(&store);

        cart.add_or_increment(&caller, AddToCart::one(product_id))
            .await
            .unwrap();

        let mut request = order_of(product_id, 1);
        request.full_name = String::new();
        let _ = CheckoutService::new(&store)
            .create_order(&caller, request)
            .await
            .unwrap_err();

        assert_eq!(cart.list(&caller).await.unwrap().item_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_order_insert_leaves_the_cart_untouched() {
        let memory = MemoryStore::default();
        let store = Store::from(memory.clone());
        let caller = caller_for(&store, "user_a").await;
        let product_id = seed_product(&store, 1000).await;
        let cart = CartService::new(&store);

        cart.add_or_increment(&caller, AddToCart::one(product_id))
            .await
            .unwrap();

        memory.fail_next_write("injected outage");
        let err = CheckoutService::new(&store)
            .create_order(&caller, order_of(product_id, 1))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(cart.list(&caller).await.unwrap().item_count(), 1);
    }
}
