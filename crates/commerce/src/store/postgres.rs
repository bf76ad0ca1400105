//! `PostgreSQL` store backend.
//!
//! Quantity changes are single conditional statements (an `ON CONFLICT`
//! upsert for add, guarded `UPDATE`/`DELETE` for increment and decrement) so
//! the database serializes concurrent mutations of the same cart line. Order
//! creation and the cart clear run inside one transaction.
//!
//! Positive product lookups go through a read-through `moka` cache with a
//! configurable TTL; bulk catalog reads for the view joins bypass it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use karavan_core::{
    CartLineId, CurrencyCode, Email, ExternalUserId, FavoriteId, OrderId, OrderStatus, Price,
    ProductId, UserId,
};

use super::{StoreBackend, StoreStats};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::{
    CartLine, CartLineChange, Favorite, FavoriteChange, NewOrder, NewProduct, Order, OrderItem,
    Product, User, UserProfile,
};

/// Products the catalog cache will hold at most.
const CATALOG_CACHE_CAPACITY: u64 = 1_000;

/// `PostgreSQL`-backed store.
pub struct PostgresStore {
    pool: PgPool,
    product_cache: Cache<ProductId, Product>,
}

impl PostgresStore {
    /// Connect a pool using the configured limits and timeouts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the connection cannot be
    /// established.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(config.database_url.expose_secret())
            .await?;

        Ok(Self::with_pool(pool, config.catalog_cache_ttl))
    }

    /// Wrap an existing pool (tests that manage their own pool lifecycle).
    #[must_use]
    pub fn with_pool(pool: PgPool, catalog_cache_ttl: Duration) -> Self {
        let product_cache = Cache::builder()
            .max_capacity(CATALOG_CACHE_CAPACITY)
            .time_to_live(catalog_cache_ttl)
            .build();

        Self {
            pool,
            product_cache,
        }
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            r"
            SELECT id, external_id, email, full_name, picture, is_admin,
                   created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            ",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        let mut users = HashMap::with_capacity(rows.len());
        for row in &rows {
            let user = user_from_row(row)?;
            users.insert(user.id, user);
        }
        Ok(users)
    }
}

#[async_trait]
impl StoreBackend for PostgresStore {
    async fn user_by_external_id(
        &self,
        external_id: &ExternalUserId,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT id, external_id, email, full_name, picture, is_admin,
                   created_at, updated_at
            FROM users
            WHERE external_id = $1
            ",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, StoreError> {
        // is_admin is deliberately absent from the update set: syncing a
        // profile must never grant or revoke privilege.
        let row = sqlx::query(
            r"
            INSERT INTO users (id, external_id, email, full_name, picture)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE
            SET email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                picture = EXCLUDED.picture,
                updated_at = NOW()
            RETURNING id, external_id, email, full_name, picture, is_admin,
                      created_at, updated_at
            ",
        )
        .bind(UserId::generate())
        .bind(&profile.external_id)
        .bind(profile.email.as_ref().map(Email::as_str))
        .bind(profile.full_name.as_deref())
        .bind(profile.picture.as_deref())
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    async fn set_user_admin(
        &self,
        external_id: &ExternalUserId,
        is_admin: bool,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r"
            UPDATE users
            SET is_admin = $2, updated_at = NOW()
            WHERE external_id = $1
            RETURNING id, external_id, email, full_name, picture, is_admin,
                      created_at, updated_at
            ",
        )
        .bind(external_id)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        if let Some(product) = self.product_cache.get(&id).await {
            debug!(product_id = %id, "catalog cache hit");
            return Ok(Some(product));
        }

        let row = sqlx::query(
            r"
            SELECT id, title, description, price_amount, price_currency, images,
                   created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let product = product_from_row(&row)?;
                self.product_cache.insert(id, product.clone()).await;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            r"
            SELECT id, title, description, price_amount, price_currency, images,
                   created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            ",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r"
            INSERT INTO products (id, title, description, price_amount, price_currency, images)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, price_amount, price_currency, images,
                      created_at, updated_at
            ",
        )
        .bind(ProductId::generate())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price.amount)
        .bind(product.price.currency_code.code())
        .bind(&product.images)
        .fetch_one(&self.pool)
        .await?;

        product_from_row(&row)
    }

    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, StoreError> {
        let row = sqlx::query(
            r"
            INSERT INTO cart_lines (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = cart_lines.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            RETURNING id, user_id, product_id, quantity, created_at, updated_at
            ",
        )
        .bind(CartLineId::generate())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        cart_line_from_row(&row)
    }

    async fn increment_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError> {
        let row = sqlx::query(
            r"
            UPDATE cart_lines
            SET quantity = quantity + 1, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, quantity, created_at, updated_at
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(cart_line_from_row).transpose()
    }

    async fn decrement_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<CartLineChange, StoreError> {
        // Both branches run in one statement against one snapshot: at the
        // floor the DELETE fires, above it the UPDATE fires, and the guarded
        // WHERE clauses keep a concurrent loser from driving quantity below 1.
        let row = sqlx::query(
            r"
            WITH removed AS (
                DELETE FROM cart_lines
                WHERE id = $1 AND user_id = $2 AND quantity <= 1
                RETURNING id
            ), bumped AS (
                UPDATE cart_lines
                SET quantity = quantity - 1, updated_at = NOW()
                WHERE id = $1 AND user_id = $2 AND quantity > 1
                RETURNING id, user_id, product_id, quantity, created_at, updated_at
            )
            SELECT (SELECT COUNT(*) FROM removed) AS removed,
                   b.id, b.user_id, b.product_id, b.quantity, b.created_at, b.updated_at
            FROM (SELECT 1) AS singleton
            LEFT JOIN bumped AS b ON TRUE
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let removed: i64 = row.try_get("removed")?;
        if removed > 0 {
            return Ok(CartLineChange::Removed);
        }

        match row.try_get::<Option<CartLineId>, _>("id")? {
            Some(id) => Ok(CartLineChange::Updated(CartLine {
                id,
                user_id: row.try_get("user_id")?,
                product_id: row.try_get("product_id")?,
                quantity: row.try_get("quantity")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(CartLineChange::Missing),
        }
    }

    async fn delete_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, product_id, quantity, created_at, updated_at
            FROM cart_lines
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(cart_line_from_row).collect()
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_order_clearing_cart(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Order insert first, cart clear second; both commit or neither.
        let row = sqlx::query(
            r"
            INSERT INTO orders (id, user_id, items, full_name, location)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, items, full_name, location, status,
                      created_at, updated_at
            ",
        )
        .bind(OrderId::generate())
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(&order.full_name)
        .bind(&order.location)
        .fetch_one(&mut *tx)
        .await?;

        let created = order_from_row(&row)?;

        sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE user_id = $1
            ",
        )
        .bind(order.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, items, full_name, location, status,
                   created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn all_orders(&self) -> Result<Vec<(Order, User)>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, items, full_name, location, status,
                   created_at, updated_at
            FROM orders
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let orders: Vec<Order> = rows.iter().map(order_from_row).collect::<Result<_, _>>()?;
        let user_ids: Vec<UserId> = orders.iter().map(|o| o.user_id).collect();
        let users = self.users_by_ids(&user_ids).await?;

        Ok(orders
            .into_iter()
            .filter_map(|order| {
                let user = users.get(&order.user_id).cloned()?;
                Some((order, user))
            })
            .collect())
    }

    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, items, full_name, location, status,
                      created_at, updated_at
            ",
        )
        .bind(order_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM orders
            WHERE id = $1
            ",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_favorite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<FavoriteChange, StoreError> {
        let deleted = sqlx::query(
            r"
            DELETE FROM favorites
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if deleted.rows_affected() > 0 {
            return Ok(FavoriteChange::Removed);
        }

        // Two concurrent toggles can both reach the insert; the unique
        // constraint turns the loser into a conflict instead of a duplicate.
        sqlx::query(
            r"
            INSERT INTO favorites (id, user_id, product_id)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(FavoriteId::generate())
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("product is already favorited".to_owned());
            }
            StoreError::Database(e)
        })?;

        Ok(FavoriteChange::Added)
    }

    async fn is_favorited(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        let favorited: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM favorites
                WHERE user_id = $1 AND product_id = $2
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(favorited)
    }

    async fn favorites(&self, user_id: UserId) -> Result<Vec<Favorite>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, product_id, created_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(favorite_from_row).collect()
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let row = sqlx::query(
            r"
            SELECT (SELECT COUNT(*) FROM products) AS products,
                   (SELECT COUNT(*) FROM orders) AS orders,
                   (SELECT COUNT(*) FROM users) AS users
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            products: row.try_get("products")?,
            orders: row.try_get("orders")?,
            users: row.try_get("users")?,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let email = row
        .try_get::<Option<String>, _>("email")?
        .map(|raw| {
            Email::parse(&raw).map_err(|e| {
                StoreError::Corruption(format!("invalid email in database: {e}"))
            })
        })
        .transpose()?;

    Ok(User {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        email,
        full_name: row.try_get("full_name")?,
        picture: row.try_get("picture")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let amount: Decimal = row.try_get("price_amount")?;
    let currency = row
        .try_get::<String, _>("price_currency")?
        .parse::<CurrencyCode>()
        .map_err(|e| StoreError::Corruption(format!("invalid currency in database: {e}")))?;

    Ok(Product {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: Price::new(amount, currency),
        images: row.try_get("images")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn cart_line_from_row(row: &PgRow) -> Result<CartLine, StoreError> {
    Ok(CartLine {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        product_id: row.try_get("product_id")?,
        quantity: row.try_get("quantity")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let Json(items) = row
        .try_get::<Json<Vec<OrderItem>>, _>("items")
        .map_err(|e| StoreError::Corruption(format!("invalid order items in database: {e}")))?;

    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        items,
        full_name: row.try_get("full_name")?,
        location: row.try_get("location")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn favorite_from_row(row: &PgRow) -> Result<Favorite, StoreError> {
    Ok(Favorite {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        product_id: row.try_get("product_id")?,
        created_at: row.try_get("created_at")?,
    })
}
