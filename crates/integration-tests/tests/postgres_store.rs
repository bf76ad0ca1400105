//! PostgreSQL backend integration tests.
//!
//! These tests require:
//! - A PostgreSQL database reachable at `KARAVAN_DATABASE_URL` (or
//!   `DATABASE_URL`)
//! - Permission to run migrations against it
//!
//! Run with:
//! ```bash
//! KARAVAN_DATABASE_URL=postgres://localhost/karavan_test \
//!     cargo test -p karavan-integration-tests -- --include-ignored
//! ```
//!
//! Data is written with unique external ids per run, so a dedicated test
//! database is recommended but reruns against the same one are safe.

#![allow(clippy::unwrap_used)]

use karavan_commerce::models::{CartLineChange, NewProduct, OrderItem, UserProfile};
use karavan_commerce::services::{
    AddToCart, CartService, CheckoutService, IdentityService, OrderService, PlaceOrder,
};
use karavan_commerce::{Caller, Store, StoreConfig};
use karavan_core::{CurrencyCode, ExternalUserId, OrderStatus, Price, ProductId, UserId};
use secrecy::SecretString;
use sqlx::PgPool;
use tokio::task::JoinSet;

async fn connect_store() -> Store {
    let url = std::env::var("KARAVAN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("set KARAVAN_DATABASE_URL to run the PostgreSQL suite");

    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../commerce/migrations")
        .run(&pool)
        .await
        .unwrap();
    pool.close().await;

    Store::connect(&StoreConfig::new(SecretString::from(url)))
        .await
        .unwrap()
}

/// External ids are unique per call so reruns never collide.
fn unique_external_id(prefix: &str) -> ExternalUserId {
    ExternalUserId::new(format!("{prefix}_{}", UserId::generate()))
}

async fn sync_shopper(store: &Store, prefix: &str) -> Caller {
    IdentityService::new(store)
        .sync_profile(&UserProfile::bare(unique_external_id(prefix)))
        .await
        .unwrap()
}

async fn seed_product(store: &Store, title: &str, cents: i64) -> ProductId {
    store
        .insert_product(&NewProduct {
            title: title.to_owned(),
            description: format!("{title} (integration test)"),
            price: Price::from_cents(cents, CurrencyCode::USD),
            images: vec![],
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database at KARAVAN_DATABASE_URL"]
async fn test_cart_checkout_round_trip() {
    let store = connect_store().await;
    let shopper = sync_shopper(&store, "it_checkout").await;
    let product_id = seed_product(&store, "Enamel Camp Mug", 1000).await;
    let carts = CartService::new(&store);

    carts
        .add_or_increment(&shopper, AddToCart::one(product_id))
        .await
        .unwrap();
    carts
        .add_or_increment(&shopper, AddToCart::one(product_id))
        .await
        .unwrap();

    let cart = carts.list(&shopper).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.item_count(), 2);

    let view = CheckoutService::new(&store)
        .create_order(
            &shopper,
            PlaceOrder {
                items: vec![OrderItem {
                    product_id,
                    quantity: 2,
                }],
                full_name: "Jane Doe".to_owned(),
                location: "Tashkent".to_owned(),
            },
        )
        .await
        .unwrap();

    assert_eq!(view.order.status, OrderStatus::Pending);
    assert_eq!(
        view.total(),
        Some(Price::from_cents(2000, CurrencyCode::USD))
    );
    assert!(carts.list(&shopper).await.unwrap().is_empty());

    let mine = OrderService::new(&store).list_for_user(&shopper).await.unwrap();
    assert!(mine.iter().any(|o| o.order.id == view.order.id));

    store.close().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database at KARAVAN_DATABASE_URL"]
async fn test_concurrent_adds_merge_in_the_database() {
    let store = connect_store().await;
    let shopper = sync_shopper(&store, "it_concurrent").await;
    let product_id = seed_product(&store, "Canvas Tote", 4200).await;

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let store = store.clone();
        let shopper = shopper.clone();
        tasks.spawn(async move {
            CartService::new(&store)
                .add_or_increment(&shopper, AddToCart::one(product_id))
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let cart = CartService::new(&store).list(&shopper).await.unwrap();
    assert_eq!(cart.lines.len(), 1, "upsert must merge concurrent adds");
    assert_eq!(cart.item_count(), 8);

    store.close().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database at KARAVAN_DATABASE_URL"]
async fn test_decrement_walks_down_to_missing() {
    let store = connect_store().await;
    let shopper = sync_shopper(&store, "it_decrement").await;
    let product_id = seed_product(&store, "Field Notebook 3-Pack", 1250).await;
    let carts = CartService::new(&store);

    let line = carts
        .add_or_increment(
            &shopper,
            AddToCart {
                product_id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    match carts.decrement(&shopper, line.id).await.unwrap() {
        CartLineChange::Updated(updated) => assert_eq!(updated.quantity, 1),
        other => panic!("expected an updated line, got {other:?}"),
    }
    assert_eq!(
        carts.decrement(&shopper, line.id).await.unwrap(),
        CartLineChange::Removed
    );
    assert_eq!(
        carts.decrement(&shopper, line.id).await.unwrap(),
        CartLineChange::Missing
    );

    store.close().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database at KARAVAN_DATABASE_URL"]
async fn test_operator_lifecycle_round_trip() {
    let store = connect_store().await;
    let identity = IdentityService::new(&store);

    let operator_id = unique_external_id("it_operator");
    identity
        .sync_profile(&UserProfile::bare(operator_id.clone()))
        .await
        .unwrap();
    store.set_admin(&operator_id, true).await.unwrap();
    let operator = identity.resolve(&operator_id).await.unwrap();
    assert!(operator.is_privileged());

    let shopper = sync_shopper(&store, "it_lifecycle").await;
    let product_id = seed_product(&store, "Wool Camp Blanket", 9800).await;
    let placed = CheckoutService::new(&store)
        .create_order(
            &shopper,
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
        .unwrap();

    let orders = OrderService::new(&store);
    let updated = orders
        .set_status(&operator, placed.order.id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Completed);

    orders.delete(&operator, placed.order.id).await.unwrap();
    assert!(orders.list_for_user(&shopper).await.unwrap().is_empty());

    store.close().await;
}
