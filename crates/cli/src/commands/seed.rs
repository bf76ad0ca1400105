//! Seed the catalog with demo products.
//!
//! The commerce services treat the catalog as read-only, so local
//! development gets its products from here. Seeding is additive and not
//! idempotent: running it twice inserts a second set of products.
//!
//! # Usage
//!
//! ```bash
//! karavan seed
//! karavan seed --admin user_demo_admin
//! ```

use karavan_commerce::models::{NewProduct, UserProfile};
use karavan_commerce::services::IdentityService;
use karavan_commerce::{Store, StoreConfig};
use karavan_core::{CurrencyCode, ExternalUserId, Price};
use tracing::info;

/// Insert demo catalog products, optionally provisioning a demo admin.
///
/// # Errors
///
/// Returns an error if configuration is missing, the connection fails, or
/// the store rejects a write.
pub async fn run(admin_external_id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::from_env()?;
    let store = Store::connect(&config).await?;

    for product in demo_products() {
        let created = store.insert_product(&product).await?;
        info!(product_id = %created.id, title = %created.title, "Seeded product");
    }

    if let Some(external_id) = admin_external_id {
        let external_id = ExternalUserId::new(external_id);
        IdentityService::new(&store)
            .sync_profile(&UserProfile::bare(external_id.clone()))
            .await?;
        store.set_admin(&external_id, true).await?;
        info!(%external_id, "Provisioned demo admin");
    }

    store.close().await;
    info!("Seeding complete!");
    Ok(())
}

fn demo_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            title: "Enamel Camp Mug".to_owned(),
            description: "Twelve-ounce enamel mug with a rolled steel rim.".to_owned(),
            price: Price::from_cents(1800, CurrencyCode::USD),
            images: vec!["https://cdn.example.com/products/camp-mug.jpg".to_owned()],
        },
        NewProduct {
            title: "Canvas Tote".to_owned(),
            description: "Heavy waxed canvas tote with leather handles.".to_owned(),
            price: Price::from_cents(4200, CurrencyCode::USD),
            images: vec!["https://cdn.example.com/products/canvas-tote.jpg".to_owned()],
        },
        NewProduct {
            title: "Field Notebook, 3-Pack".to_owned(),
            description: "Pocket-sized dot grid notebooks, 48 pages each.".to_owned(),
            price: Price::from_cents(1250, CurrencyCode::USD),
            images: vec!["https://cdn.example.com/products/field-notebook.jpg".to_owned()],
        },
        NewProduct {
            title: "Wool Camp Blanket".to_owned(),
            description: "Merino blend blanket, 130 by 180 centimeters.".to_owned(),
            price: Price::from_cents(9800, CurrencyCode::USD),
            images: vec![
                "https://cdn.example.com/products/camp-blanket.jpg".to_owned(),
                "https://cdn.example.com/products/camp-blanket-folded.jpg".to_owned(),
            ],
        },
        NewProduct {
            title: "Brass Bottle Opener".to_owned(),
            description: "Solid brass, ages into its own patina.".to_owned(),
            price: Price::from_cents(950, CurrencyCode::USD),
            images: vec![],
        },
    ]
}
