//! Favorite (wishlist) domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karavan_core::{FavoriteId, ProductId, UserId};

/// A product a user has marked as a favorite.
///
/// At most one row exists per `(user_id, product_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    /// Favorite ID.
    pub id: FavoriteId,
    /// User who marked the product.
    pub user_id: UserId,
    /// The marked product.
    pub product_id: ProductId,
    /// When the mark was set.
    pub created_at: DateTime<Utc>,
}

/// Outcome of toggling a favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    /// The product is now a favorite.
    Added,
    /// The product is no longer a favorite.
    Removed,
}

impl FavoriteChange {
    /// Whether the product is favorited after the toggle.
    #[must_use]
    pub const fn is_favorited(&self) -> bool {
        matches!(self, Self::Added)
    }
}

/// A favorite joined with its catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteView {
    /// The persisted favorite.
    pub favorite: Favorite,
    /// The product it references.
    pub product: super::Product,
}
