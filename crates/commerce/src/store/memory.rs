//! In-memory store backend.
//!
//! Backs every service without infrastructure: tests and local development
//! run against this, `PostgreSQL` in production. One mutex guards all state,
//! so each backend operation is trivially atomic, including the two-step
//! order-then-clear unit.
//!
//! Beyond the backend contract it carries two helpers the contract
//! deliberately omits: one-shot write-fault injection for failure-path tests,
//! and product removal for exercising the "product has left the catalog"
//! read paths.

#![allow(clippy::significant_drop_tightening)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use karavan_core::{
    CartLineId, ExternalUserId, FavoriteId, OrderId, OrderStatus, ProductId, UserId,
};

use super::{StoreBackend, StoreStats};
use crate::error::StoreError;
use crate::models::{
    CartLine, CartLineChange, Favorite, FavoriteChange, NewOrder, NewProduct, Order, Product,
    User, UserProfile,
};

fn row_count(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    products: Vec<Product>,
    cart_lines: Vec<CartLine>,
    orders: Vec<Order>,
    favorites: Vec<Favorite>,
    fail_next_write: Option<String>,
}

impl Inner {
    /// Consume a pending injected fault, if armed.
    fn take_fault(&mut self) -> Result<(), StoreError> {
        match self.fail_next_write.take() {
            Some(reason) => Err(StoreError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

/// Thread-safe in-memory backend.
///
/// Cheap to clone; clones share state, so a test can keep one handle for
/// fault injection while the services drive another through [`Store`].
///
/// [`Store`]: super::Store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot fault: the next write operation fails with
    /// [`StoreError::Unavailable`] and applies nothing.
    ///
    /// Reads are unaffected. The fault is consumed by the first write that
    /// trips it.
    pub fn fail_next_write(&self, reason: impl Into<String>) {
        self.inner.lock().fail_next_write = Some(reason.into());
    }

    /// Remove a product from the catalog, as the external catalog owner
    /// would. Returns whether a product was removed.
    ///
    /// Cart lines and order items keep their references; the read-side joins
    /// are expected to cope.
    pub fn remove_product(&self, id: ProductId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        inner.products.len() < before
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn user_by_external_id(
        &self,
        external_id: &ExternalUserId,
    ) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .users
            .iter()
            .find(|u| u.external_id == *external_id)
            .cloned())
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let now = Utc::now();
        if let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| u.external_id == profile.external_id)
        {
            user.email = profile.email.clone();
            user.full_name = profile.full_name.clone();
            user.picture = profile.picture.clone();
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: UserId::generate(),
            external_id: profile.external_id.clone(),
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            picture: profile.picture.clone(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_admin(
        &self,
        external_id: &ExternalUserId,
        is_admin: bool,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        Ok(inner
            .users
            .iter_mut()
            .find(|u| u.external_id == *external_id)
            .map(|user| {
                user.is_admin = is_admin;
                user.updated_at = Utc::now();
                user.clone()
            }))
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            images: product.images.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let now = Utc::now();
        if let Some(line) = inner
            .cart_lines
            .iter_mut()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
        {
            line.quantity += quantity;
            line.updated_at = now;
            return Ok(line.clone());
        }

        let line = CartLine {
            id: CartLineId::generate(),
            user_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        };
        inner.cart_lines.push(line.clone());
        Ok(line)
    }

    async fn increment_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        Ok(inner
            .cart_lines
            .iter_mut()
            .find(|l| l.id == line_id && l.user_id == user_id)
            .map(|line| {
                line.quantity += 1;
                line.updated_at = Utc::now();
                line.clone()
            }))
    }

    async fn decrement_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<CartLineChange, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let Some(position) = inner
            .cart_lines
            .iter()
            .position(|l| l.id == line_id && l.user_id == user_id)
        else {
            return Ok(CartLineChange::Missing);
        };

        // Split to satisfy the borrow checker: read quantity, then mutate.
        let at_floor = inner
            .cart_lines
            .get(position)
            .is_some_and(|l| l.quantity <= 1);

        if at_floor {
            inner.cart_lines.remove(position);
            return Ok(CartLineChange::Removed);
        }

        let Some(line) = inner.cart_lines.get_mut(position) else {
            return Ok(CartLineChange::Missing);
        };
        line.quantity -= 1;
        line.updated_at = Utc::now();
        Ok(CartLineChange::Updated(line.clone()))
    }

    async fn delete_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let before = inner.cart_lines.len();
        inner
            .cart_lines
            .retain(|l| !(l.id == line_id && l.user_id == user_id));
        Ok(inner.cart_lines.len() < before)
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let inner = self.inner.lock();
        // Insertion order is creation order; reverse for newest-first.
        Ok(inner
            .cart_lines
            .iter()
            .rev()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let before = inner.cart_lines.len();
        inner.cart_lines.retain(|l| l.user_id != user_id);
        Ok((before - inner.cart_lines.len()) as u64)
    }

    async fn create_order_clearing_cart(&self, order: &NewOrder) -> Result<Order, StoreError> {
        // One lock across both steps: the order append and the cart clear
        // cannot be observed half-done, and a fault applies to neither.
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            user_id: order.user_id,
            items: order.items.clone(),
            full_name: order.full_name.clone(),
            location: order.location.clone(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.orders.push(order.clone());
        inner.cart_lines.retain(|l| l.user_id != order.user_id);
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<(Order, User)>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter_map(|order| {
                let user = inner.users.iter().find(|u| u.id == order.user_id)?;
                Some((order.clone(), user.clone()))
            })
            .collect())
    }

    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        Ok(inner
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .map(|order| {
                order.status = status;
                order.updated_at = Utc::now();
                order.clone()
            }))
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let before = inner.orders.len();
        inner.orders.retain(|o| o.id != order_id);
        Ok(inner.orders.len() < before)
    }

    async fn toggle_favorite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<FavoriteChange, StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault()?;

        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|f| !(f.user_id == user_id && f.product_id == product_id));
        if inner.favorites.len() < before {
            return Ok(FavoriteChange::Removed);
        }

        inner.favorites.push(Favorite {
            id: FavoriteId::generate(),
            user_id,
            product_id,
            created_at: Utc::now(),
        });
        Ok(FavoriteChange::Added)
    }

    async fn is_favorited(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.product_id == product_id))
    }

    async fn favorites(&self, user_id: UserId) -> Result<Vec<Favorite>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .favorites
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.inner.lock();
        Ok(StoreStats {
            products: row_count(inner.products.len()),
            orders: row_count(inner.orders.len()),
            users: row_count(inner.users.len()),
        })
    }

    async fn close(&self) {}
}
