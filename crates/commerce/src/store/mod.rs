//! Persistence for carts, orders, users, and favorites.
//!
//! Every component talks to storage through the [`Store`] handle, constructed
//! once at process start ([`Store::connect`] for `PostgreSQL`,
//! [`Store::in_memory`] for tests and local development) and passed into each
//! service. There is no ambient connection: the handle is the only way in.
//!
//! The backend contract keeps each quantity change a single conditional
//! operation (increment-or-insert as an upsert, decrement with a floor check)
//! so concurrent requests for the same cart line can never lose updates, and
//! it exposes order creation plus cart clearing as one operation so the two
//! steps share the backend's atomicity unit.
//!
//! # Migrations
//!
//! The `PostgreSQL` schema lives in `crates/commerce/migrations/` and is run
//! via:
//! ```bash
//! cargo run -p karavan-cli -- migrate
//! ```

mod memory;
mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use karavan_core::{CartLineId, ExternalUserId, OrderId, OrderStatus, ProductId, UserId};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::{
    CartLine, CartLineChange, Favorite, FavoriteChange, NewOrder, NewProduct, Order, Product,
    User, UserProfile,
};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Row counts for the operator dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of catalog products.
    pub products: i64,
    /// Number of orders, across all statuses.
    pub orders: i64,
    /// Number of synced users.
    pub users: i64,
}

/// The persistence contract both backends implement.
///
/// Each method documents its atomicity: callers rely on mutations being
/// single conditional operations, never read-then-write sequences.
#[async_trait]
pub(crate) trait StoreBackend: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user by the identity provider's stable id.
    async fn user_by_external_id(
        &self,
        external_id: &ExternalUserId,
    ) -> Result<Option<User>, StoreError>;

    /// Insert or update the user keyed by `profile.external_id`.
    ///
    /// One atomic upsert: profile fields are overwritten, `is_admin` is never
    /// touched (false on first insert, preserved afterwards).
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, StoreError>;

    /// Set the admin flag on the user with this external id.
    ///
    /// Returns `None` when no such user has been synced.
    async fn set_user_admin(
        &self,
        external_id: &ExternalUserId,
        is_admin: bool,
    ) -> Result<Option<User>, StoreError>;

    // =========================================================================
    // Catalog (read-only for the services; writes are ops tooling)
    // =========================================================================

    /// Look up a product by id.
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Fetch the products that exist among `ids`, in no particular order.
    ///
    /// Missing ids are simply absent from the result; the read-side joins
    /// treat that as "no longer in the catalog".
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    /// Insert a catalog product. Used by seeding only, never by the services.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError>;

    // =========================================================================
    // Cart lines
    // =========================================================================

    /// Add `quantity` to the user's line for this product, creating the line
    /// if it does not exist.
    ///
    /// One atomic increment-or-insert keyed on `(user_id, product_id)`: two
    /// concurrent adds for the same pair both land on a single line.
    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, StoreError>;

    /// Add one to a line's quantity, scoped to the owning user.
    ///
    /// One conditional update; returns `None` when the line does not exist
    /// (or belongs to someone else), which callers treat as a no-op.
    async fn increment_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Subtract one from a line's quantity, deleting the line at the floor.
    ///
    /// One conditional statement: quantity 1 deletes, quantity above 1
    /// decrements, a missing line reports [`CartLineChange::Missing`]. Under
    /// a concurrent mutation of the same line the losing request may also
    /// observe `Missing`; it never stores a non-positive quantity.
    async fn decrement_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<CartLineChange, StoreError>;

    /// Delete a line unconditionally, scoped to the owning user.
    ///
    /// Returns whether a line was deleted.
    async fn delete_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<bool, StoreError>;

    /// All cart lines for a user, most recently created first.
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError>;

    /// Delete every cart line for a user. Returns the number deleted.
    async fn clear_cart(&self, user_id: UserId) -> Result<u64, StoreError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Persist a new pending order and clear the user's cart, as one unit.
    ///
    /// The order insert runs before the cart clear inside a single
    /// transaction (`PostgreSQL`) or critical section (memory): on any
    /// failure nothing is applied, so the cart can never be observed cleared
    /// without its order existing, nor the order placed with stale lines
    /// still visible.
    async fn create_order_clearing_cart(&self, order: &NewOrder) -> Result<Order, StoreError>;

    /// All orders for a user, most recently placed first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Every order across all users with its customer, newest first.
    async fn all_orders(&self) -> Result<Vec<(Order, User)>, StoreError>;

    /// Overwrite an order's status; any status may replace any other.
    ///
    /// Returns the updated order, or `None` when the id references nothing.
    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError>;

    /// Hard-delete an order. Returns whether an order was deleted.
    async fn delete_order(&self, order_id: OrderId) -> Result<bool, StoreError>;

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Insert the favorite if absent, remove it if present.
    async fn toggle_favorite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<FavoriteChange, StoreError>;

    /// Whether the user has favorited this product.
    async fn is_favorited(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, StoreError>;

    /// All favorites for a user, most recently marked first.
    async fn favorites(&self, user_id: UserId) -> Result<Vec<Favorite>, StoreError>;

    // =========================================================================
    // Stats & lifecycle
    // =========================================================================

    /// Row counts for the operator dashboard.
    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Release backend resources. The handle must not be used afterwards.
    async fn close(&self);
}

/// Handle to the commerce store.
///
/// Cheap to clone; clones share the backend. Open one at process start, pass
/// it into each service, and [`close`](Store::close) it at shutdown.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StoreBackend>,
}

impl Store {
    /// Connect to `PostgreSQL` using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be established.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend = PostgresStore::connect(config).await?;
        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// A fresh in-memory store, for tests and local development.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from(MemoryStore::new())
    }

    /// Close the backend. Pending operations on clones will start failing.
    pub async fn close(&self) {
        self.backend.close().await;
    }

    pub(crate) fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }

    // =========================================================================
    // Ops tooling surface
    //
    // The services treat the catalog as read-only and never grant privilege;
    // seeding and admin grants go through these instead (CLI, fixtures).
    // =========================================================================

    /// Insert a catalog product.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend rejects the write.
    pub async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        self.backend.insert_product(product).await
    }

    /// Set or clear the admin flag on a synced user.
    ///
    /// Returns `None` when no user with this external id has been synced.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend rejects the write.
    pub async fn set_admin(
        &self,
        external_id: &ExternalUserId,
        is_admin: bool,
    ) -> Result<Option<User>, StoreError> {
        self.backend.set_user_admin(external_id, is_admin).await
    }
}

impl From<MemoryStore> for Store {
    fn from(memory: MemoryStore) -> Self {
        Self {
            backend: Arc::new(memory),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
