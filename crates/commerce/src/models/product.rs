//! Catalog product types.
//!
//! The commerce core reads the catalog but never writes it; products are
//! managed out of band (seeding, back office). `NewProduct` exists for those
//! write paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karavan_core::{Price, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// Plain text description.
    pub description: String,
    /// Current unit price.
    pub price: Price,
    /// Image URLs, first one is the featured image.
    pub images: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The featured image, when the product has any images at all.
    #[must_use]
    pub fn featured_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Input for inserting a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    /// Product title.
    pub title: String,
    /// Plain text description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Image URLs.
    pub images: Vec<String>,
}
