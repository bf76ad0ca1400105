//! Integration tests for Karavan.
//!
//! These tests exercise cross-service flows (identity, cart, checkout,
//! orders, favorites) against the in-memory store, including the
//! concurrency and failure-injection scenarios the service layer promises
//! to survive. The `postgres_store` suite runs the same flows against a
//! real database and is ignored unless one is available.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory suites, no infrastructure required
//! cargo test -p karavan-integration-tests
//!
//! # Including the PostgreSQL suite
//! KARAVAN_DATABASE_URL=postgres://localhost/karavan_test \
//!     cargo test -p karavan-integration-tests -- --include-ignored
//! ```

// Test support code; a broken harness should panic loudly.
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use karavan_commerce::models::{NewProduct, Product, UserProfile};
use karavan_commerce::services::IdentityService;
use karavan_commerce::store::MemoryStore;
use karavan_commerce::{Caller, Store};
use karavan_core::{CurrencyCode, ExternalUserId, Price};

/// A seeded in-memory store with one shopper and one operator.
///
/// `memory` is the concrete handle, kept around for fault injection and
/// catalog removal; `store` is the handle every service takes.
pub struct TestContext {
    pub memory: MemoryStore,
    pub store: Store,
    pub shopper: Caller,
    pub admin: Caller,
}

impl TestContext {
    /// Seed a fresh store with `user_shopper` and a privileged `user_admin`.
    pub async fn new() -> Self {
        let memory = MemoryStore::new();
        let store = Store::from(memory.clone());
        let identity = IdentityService::new(&store);

        let shopper = identity
            .sync_profile(&UserProfile::bare(ExternalUserId::new("user_shopper")))
            .await
            .unwrap();

        let admin_id = ExternalUserId::new("user_admin");
        identity
            .sync_profile(&UserProfile::bare(admin_id.clone()))
            .await
            .unwrap();
        store.set_admin(&admin_id, true).await.unwrap();
        let admin = identity.resolve(&admin_id).await.unwrap();

        Self {
            memory,
            store,
            shopper,
            admin,
        }
    }

    /// Sync and resolve another shopper.
    pub async fn shopper_named(&self, external_id: &str) -> Caller {
        IdentityService::new(&self.store)
            .sync_profile(&UserProfile::bare(ExternalUserId::new(external_id)))
            .await
            .unwrap()
    }

    /// Insert a catalog product priced in USD.
    pub async fn seed_product(&self, title: &str, cents: i64) -> Product {
        self.store
            .insert_product(&NewProduct {
                title: title.to_owned(),
                description: format!("{title} (test catalog)"),
                price: Price::from_cents(cents, CurrencyCode::USD),
                images: vec![],
            })
            .await
            .unwrap()
    }
}
