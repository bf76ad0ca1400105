//! Order lifecycle management from the operator's side.
//!
//! Status changes, deletion, the all-orders listing, and store stats are
//! privileged operations over a closed status vocabulary. These tests
//! cover the boundary parse, the unrestricted transitions behind it, and
//! the privilege wall in front of it.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use karavan_commerce::models::{OrderItem, OrderView};
use karavan_commerce::services::{AddToCart, CartService, CheckoutService, OrderService, PlaceOrder};
use karavan_commerce::{Caller, CommerceError, NotFound};
use karavan_core::{OrderStatus, ProductId};
use karavan_integration_tests::TestContext;

async fn place_order(
    ctx: &TestContext,
    caller: &Caller,
    product_id: ProductId,
    quantity: i64,
) -> OrderView {
    CheckoutService::new(&ctx.store)
        .create_order(
            caller,
            PlaceOrder {
                items: vec![OrderItem {
                    product_id,
                    quantity,
                }],
                full_name: "Sam Byrne".to_owned(),
                location: "12 Harbor St".to_owned(),
            },
        )
        .await
        .unwrap()
}

// ===== Status Vocabulary =====

#[tokio::test]
async fn test_unknown_status_is_rejected_at_the_boundary() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Enamel Camp Mug", 1800).await;
    let placed = place_order(&ctx, &ctx.shopper, product.id, 1).await;

    let err = "refunded".parse::<OrderStatus>().unwrap_err();
    assert_eq!(err.input, "refunded");

    // The vocabulary is lowercase; display casing is not accepted.
    assert!("Completed".parse::<OrderStatus>().is_err());

    // Nothing reached the store, so the order still reads as placed.
    let orders = OrderService::new(&ctx.store)
        .list_for_user(&ctx.shopper)
        .await
        .unwrap();
    assert_eq!(orders[0].order.id, placed.order.id);
    assert_eq!(orders[0].order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_transitions_between_known_statuses_are_unrestricted() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Canvas Tote", 4200).await;
    let placed = place_order(&ctx, &ctx.shopper, product.id, 1).await;
    let orders = OrderService::new(&ctx.store);

    for status in [
        OrderStatus::Completed,
        OrderStatus::Pending,
        OrderStatus::Canceled,
    ] {
        let updated = orders
            .set_status(&ctx.admin, placed.order.id, status)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }

    let mine = orders.list_for_user(&ctx.shopper).await.unwrap();
    assert_eq!(mine[0].order.status, OrderStatus::Canceled);
}

// ===== Operator Listing =====

#[tokio::test]
async fn test_all_orders_listing_joins_customers_newest_first() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Field Notebook 3-Pack", 1250).await;
    let other = ctx.shopper_named("user_other").await;

    let first = place_order(&ctx, &ctx.shopper, product.id, 1).await;
    let second = place_order(&ctx, &other, product.id, 2).await;

    let all = OrderService::new(&ctx.store)
        .list_all(&ctx.admin)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    assert_eq!(all[0].view.order.id, second.order.id);
    assert_eq!(all[0].customer.id, other.user_id());
    assert_eq!(all[1].view.order.id, first.order.id);
    assert_eq!(all[1].customer.id, ctx.shopper.user_id());
}

#[tokio::test]
async fn test_stats_count_the_whole_store() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Wool Camp Blanket", 9800).await;
    ctx.seed_product("Brass Bottle Opener", 950).await;
    place_order(&ctx, &ctx.shopper, product.id, 1).await;

    let stats = OrderService::new(&ctx.store)
        .stats(&ctx.admin)
        .await
        .unwrap();
    assert_eq!(stats.products, 2);
    assert_eq!(stats.orders, 1);
    assert_eq!(stats.users, 2);
}

// ===== Privilege Wall =====

#[tokio::test]
async fn test_lifecycle_operations_are_operator_only() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Enamel Camp Mug", 1800).await;
    let placed = place_order(&ctx, &ctx.shopper, product.id, 1).await;
    let orders = OrderService::new(&ctx.store);

    let forbidden = [
        orders
            .set_status(&ctx.shopper, placed.order.id, OrderStatus::Completed)
            .await
            .map(|_| ()),
        orders.delete(&ctx.shopper, placed.order.id).await,
        orders.list_all(&ctx.shopper).await.map(|_| ()),
        orders.stats(&ctx.shopper).await.map(|_| ()),
    ];
    for result in forbidden {
        assert!(matches!(result, Err(CommerceError::Forbidden(_))));
    }

    // The order is exactly as the shopper left it.
    let mine = orders.list_for_user(&ctx.shopper).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].order.status, OrderStatus::Pending);
}

// ===== End to End =====

#[tokio::test]
async fn test_an_order_walks_from_checkout_to_completed() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Enamel Camp Mug", 1000).await;
    let carts = CartService::new(&ctx.store);
    let orders = OrderService::new(&ctx.store);

    carts
        .add_or_increment(&ctx.shopper, AddToCart::one(product.id))
        .await
        .unwrap();
    carts
        .add_or_increment(&ctx.shopper, AddToCart::one(product.id))
        .await
        .unwrap();
    let cart = carts.list(&ctx.shopper).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.item_count(), 2);

    let placed = CheckoutService::new(&ctx.store)
        .create_order(
            &ctx.shopper,
            PlaceOrder {
                items: vec![OrderItem {
                    product_id: product.id,
                    quantity: 2,
                }],
                full_name: "Jane Doe".to_owned(),
                location: "Tashkent".to_owned(),
            },
        )
        .await
        .unwrap();
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert!(carts.list(&ctx.shopper).await.unwrap().is_empty());

    orders
        .set_status(&ctx.admin, placed.order.id, OrderStatus::Completed)
        .await
        .unwrap();

    // The shopper and the operator read the same fulfilled order.
    let mine = orders.list_for_user(&ctx.shopper).await.unwrap();
    assert_eq!(mine[0].order.id, placed.order.id);
    assert_eq!(mine[0].order.status, OrderStatus::Completed);

    let all = orders.list_all(&ctx.admin).await.unwrap();
    assert!(all
        .iter()
        .any(|entry| entry.view.order.id == placed.order.id
            && entry.view.order.status == OrderStatus::Completed));
}

#[tokio::test]
async fn test_delete_removes_the_order_for_good() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Canvas Tote", 4200).await;
    let placed = place_order(&ctx, &ctx.shopper, product.id, 3).await;
    let orders = OrderService::new(&ctx.store);

    orders.delete(&ctx.admin, placed.order.id).await.unwrap();
    assert!(orders.list_for_user(&ctx.shopper).await.unwrap().is_empty());

    let err = orders.delete(&ctx.admin, placed.order.id).await.unwrap_err();
    assert!(matches!(
        err,
        CommerceError::NotFound(NotFound::Order(id)) if id == placed.order.id
    ));
}
