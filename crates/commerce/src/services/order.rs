//! Order lifecycle: listing, status changes, deletion, operator stats.
//!
//! Orders store bare {product, quantity} items; every listing here joins
//! them against the current catalog, so displayed prices always reflect
//! today's catalog rather than a frozen snapshot.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use karavan_core::{OrderId, OrderStatus, ProductId};

use crate::caller::Caller;
use crate::error::{CommerceError, NotFound};
use crate::models::{AdminOrderView, Order, OrderItemView, OrderView, Product};
use crate::store::{Store, StoreStats};

use super::catalog_by_ids;

/// Order lifecycle operations.
pub struct OrderService<'a> {
    store: &'a Store,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// The caller's orders, newest first, joined with the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()))]
    pub async fn list_for_user(&self, caller: &Caller) -> Result<Vec<OrderView>, CommerceError> {
        let orders = self
            .store
            .backend()
            .orders_for_user(caller.user_id())
            .await?;

        let views = order_views(self.store, orders).await?;
        debug!(orders = views.len(), "listed caller orders");
        Ok(views)
    }

    /// Every order across all users, newest first, for operator review.
    ///
    /// Each entry carries the customer record alongside the catalog join.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Forbidden` if the caller is not privileged.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()))]
    pub async fn list_all(&self, caller: &Caller) -> Result<Vec<AdminOrderView>, CommerceError> {
        caller.require_privileged("listing all orders")?;

        let orders = self.store.backend().all_orders().await?;
        let ids = item_product_ids(orders.iter().map(|(order, _)| order));
        let catalog = catalog_by_ids(self.store, &ids).await?;

        let views: Vec<AdminOrderView> = orders
            .into_iter()
            .map(|(order, customer)| AdminOrderView {
                view: join_order(order, &catalog),
                customer,
            })
            .collect();

        debug!(orders = views.len(), "listed all orders");
        Ok(views)
    }

    /// Overwrite an order's status.
    ///
    /// No state-machine guard: any recognized status may replace any other.
    /// Unrecognized status strings never reach this far; the enum's parse
    /// rejects them at the boundary.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Forbidden` if the caller is not privileged.
    /// Returns `CommerceError::NotFound` if no order carries this id.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(
        skip(self, caller),
        fields(user_id = %caller.user_id(), order_id = %order_id, status = %status)
    )]
    pub async fn set_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, CommerceError> {
        caller.require_privileged("updating order status")?;

        let order = self
            .store
            .backend()
            .set_order_status(order_id, status)
            .await?
            .ok_or(NotFound::Order(order_id))?;

        info!("order status updated");
        Ok(order)
    }

    /// Hard-delete an order record.
    ///
    /// There is no soft delete and no audit trail; the record is gone.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Forbidden` if the caller is not privileged.
    /// Returns `CommerceError::NotFound` if no order carries this id.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id(), order_id = %order_id))]
    pub async fn delete(&self, caller: &Caller, order_id: OrderId) -> Result<(), CommerceError> {
        caller.require_privileged("deleting orders")?;

        if !self.store.backend().delete_order(order_id).await? {
            return Err(NotFound::Order(order_id).into());
        }

        info!("order deleted");
        Ok(())
    }

    /// Store-wide counts for the operator dashboard.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Forbidden` if the caller is not privileged.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()))]
    pub async fn stats(&self, caller: &Caller) -> Result<StoreStats, CommerceError> {
        caller.require_privileged("viewing store stats")?;

        let stats = self.store.backend().stats().await?;
        debug!(
            products = stats.products,
            orders = stats.orders,
            users = stats.users,
            "collected store stats"
        );
        Ok(stats)
    }
}

// =============================================================================
// Catalog Joins
// =============================================================================

/// Join one order against the catalog for display.
pub(super) async fn order_view(store: &Store, order: Order) -> Result<OrderView, CommerceError> {
    let ids = item_product_ids(std::iter::once(&order));
    let catalog = catalog_by_ids(store, &ids).await?;
    Ok(join_order(order, &catalog))
}

/// Join a batch of orders against the catalog with one bulk lookup.
pub(super) async fn order_views(
    store: &Store,
    orders: Vec<Order>,
) -> Result<Vec<OrderView>, CommerceError> {
    let ids = item_product_ids(orders.iter());
    let catalog = catalog_by_ids(store, &ids).await?;
    Ok(orders
        .into_iter()
        .map(|order| join_order(order, &catalog))
        .collect())
}

fn item_product_ids<'o>(orders: impl Iterator<Item = &'o Order>) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = orders
        .flat_map(|order| order.items.iter().map(|item| item.product_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn join_order(order: Order, catalog: &HashMap<ProductId, Product>) -> OrderView {
    let items = order
        .items
        .iter()
        .map(|item| OrderItemView {
            product_id: item.product_id,
            quantity: item.quantity,
            product: catalog.get(&item.product_id).cloned(),
        })
        .collect();

    OrderView { order, items }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use karavan_core::{CurrencyCode, ExternalUserId, Price};

    use crate::models::{NewProduct, OrderItem, UserProfile};
    use crate::services::{CheckoutService, IdentityService, PlaceOrder};
    use crate::store::MemoryStore;

    use super::*;

    async fn caller_for(store: &Store, external_id: &str) -> Caller {
        IdentityService::new(store)
            .sync_profile(&UserProfile::bare(ExternalUserId::new(external_id)))
            .await
            .unwrap()
    }

    async fn admin_for(store: &Store, external_id: &str) -> Caller {
        caller_for(store, external_id).await;
        store
            .set_admin(&ExternalUserId::new(external_id), true)
            .await
            .unwrap();
        IdentityService::new(store)
            .resolve(&ExternalUserId::new(external_id))
            .await
            .unwrap()
    }

    async fn seed_product(store: &Store, cents: i64) -> karavan_core::ProductId {
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

    async fn place_order(store: &Store, caller: &Caller, product_id: ProductId) -> Order {
        CheckoutService::new(store)
            .create_order(
                caller,
                PlaceOrder {
                    items: vec![OrderItem {
                        product_id,
                        quantity: 1,
                    }],
                    full_name: "Sam Byrne".to_owned(),
                    location: "12 Harbor St".to_owned(),
                },
            )
            .await
            .unwrap()
            .order
    }

    #[tokio::test]
    async fn test_list_all_requires_privilege() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;

        let err = OrderService::new(&store)
            .list_all(&shopper)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Forbidden(_)));
        assert_eq!(
            err.to_string(),
            "forbidden: listing all orders requires the admin role"
        );
    }

    #[tokio::test]
    async fn test_set_status_requires_privilege() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;

        let err = OrderService::new(&store)
            .set_status(&shopper, OrderId::generate(), OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_requires_privilege() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;

        let err = OrderService::new(&store)
            .delete(&shopper, OrderId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_stats_requires_privilege() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;

        let err = OrderService::new(&store).stats(&shopper).await.unwrap_err();
        assert!(matches!(err, CommerceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_privilege_check_runs_before_store_access() {
        let memory = MemoryStore::default();
        let store = Store::from(memory.clone());
        let shopper = caller_for(&store, "user_shopper").await;
        let admin = admin_for(&store, "user_admin").await;
        let orders = OrderService::new(&store);

        memory.fail_next_write("injected outage");

        // The rejected call must not consume the armed fault.
        let err = orders
            .set_status(&shopper, OrderId::generate(), OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Forbidden(_)));

        // The next store write trips it, proving the fault was still armed.
        let err = orders
            .set_status(&admin, OrderId::generate(), OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::Store(crate::error::StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_set_status_overwrites_freely() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;
        let admin = admin_for(&store, "user_admin").await;
        let product_id = seed_product(&store, 1000).await;
        let order = place_order(&store, &shopper, product_id).await;
        let orders = OrderService::new(&store);

        orders
            .set_status(&admin, order.id, OrderStatus::Completed)
            .await
            .unwrap();
        let back = orders
            .set_status(&admin, order.id, OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(back.status, OrderStatus::Pending);

        let views = orders.list_for_user(&shopper).await.unwrap();
        assert_eq!(views.first().unwrap().order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_set_status_on_unknown_order_is_not_found() {
        let store = Store::in_memory();
        let admin = admin_for(&store, "user_admin").await;

        let missing = OrderId::generate();
        let err = OrderService::new(&store)
            .set_status(&admin, missing, OrderStatus::Canceled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::NotFound(NotFound::Order(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_the_order() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;
        let admin = admin_for(&store, "user_admin").await;
        let product_id = seed_product(&store, 1000).await;
        let order = place_order(&store, &shopper, product_id).await;
        let orders = OrderService::new(&store);

        orders.delete(&admin, order.id).await.unwrap();
        assert!(orders.list_for_user(&shopper).await.unwrap().is_empty());

        let err = orders.delete(&admin, order.id).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound(NotFound::Order(_))));
    }

    #[tokio::test]
    async fn test_list_all_carries_the_customer() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;
        let admin = admin_for(&store, "user_admin").await;
        let product_id = seed_product(&store, 2500).await;
        let order = place_order(&store, &shopper, product_id).await;

        let views = OrderService::new(&store).list_all(&admin).await.unwrap();
        let entry = views.first().unwrap();
        assert_eq!(entry.view.order.id, order.id);
        assert_eq!(entry.customer.id, shopper.user_id());
        assert_eq!(
            entry.view.total(),
            Some(Price::from_cents(2500, CurrencyCode::USD))
        );
    }

    #[tokio::test]
    async fn test_stats_counts_the_store() {
        let store = Store::in_memory();
        let shopper = caller_for(&store, "user_shopper").await;
        let admin = admin_for(&store, "user_admin").await;
        let product_id = seed_product(&store, 1000).await;
        seed_product(&store, 2500).await;
        place_order(&store, &shopper, product_id).await;

        let stats = OrderService::new(&store).stats(&admin).await.unwrap();
        assert_eq!(stats.products, 2);
        assert_eq!(stats.orders, 1);
        assert_eq!(stats.users, 2);
    }

    #[tokio::test]
    async fn test_list_joins_survive_a_delisted_product() {
        let memory = MemoryStore::default();
        let store = Store::from(memory.clone());
        let shopper = caller_for(&store, "user_shopper").await;
        let product_id = seed_product(&store, 1000).await;
        place_order(&store, &shopper, product_id).await;

        assert!(memory.remove_product(product_id));

        let views = OrderService::new(&store)
            .list_for_user(&shopper)
            .await
            .unwrap();
        let view = views.first().unwrap();
        assert!(view.items.first().unwrap().product.is_none());
        assert_eq!(view.total(), Some(Price::zero(CurrencyCode::default())));
    }
}
