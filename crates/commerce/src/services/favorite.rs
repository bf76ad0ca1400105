//! Favorites: per-user product bookmarks.

use tracing::{debug, info, instrument};

use karavan_core::ProductId;

use crate::caller::Caller;
use crate::error::{CommerceError, NotFound};
use crate::models::{FavoriteChange, FavoriteView};
use crate::store::Store;

use super::catalog_by_ids;

/// Favorite toggling and listing, scoped to the calling user.
pub struct FavoriteService<'a> {
    store: &'a Store,
}

impl<'a> FavoriteService<'a> {
    /// Create a new favorite service.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Flip whether a product is in the caller's favorites.
    ///
    /// Returns the side the toggle landed on.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product is not in the
    /// catalog. Returns `CommerceError::Conflict` if a concurrent toggle won
    /// the insert race. Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id(), product_id = %product_id))]
    pub async fn toggle(
        &self,
        caller: &Caller,
        product_id: ProductId,
    ) -> Result<FavoriteChange, CommerceError> {
        let product = self
            .store
            .backend()
            .product_by_id(product_id)
            .await?
            .ok_or(NotFound::Product(product_id))?;

        let change = self
            .store
            .backend()
            .toggle_favorite(caller.user_id(), product.id)
            .await?;

        info!(favorited = change.is_favorited(), "toggled favorite");
        Ok(change)
    }

    /// Whether the product is currently in the caller's favorites.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id(), product_id = %product_id))]
    pub async fn is_favorited(
        &self,
        caller: &Caller,
        product_id: ProductId,
    ) -> Result<bool, CommerceError> {
        let favorited = self
            .store
            .backend()
            .is_favorited(caller.user_id(), product_id)
            .await?;

        debug!(favorited, "checked favorite membership");
        Ok(favorited)
    }

    /// The caller's favorites joined with the catalog, newest first.
    ///
    /// Rows whose product has left the catalog are excluded.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()))]
    pub async fn list(&self, caller: &Caller) -> Result<Vec<FavoriteView>, CommerceError> {
        let favorites = self.store.backend().favorites(caller.user_id()).await?;
        if favorites.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = favorites.iter().map(|f| f.product_id).collect();
        let catalog = catalog_by_ids(self.store, &ids).await?;

        let views: Vec<FavoriteView> = favorites
            .into_iter()
            .filter_map(|favorite| {
                let product = catalog.get(&favorite.product_id).cloned()?;
                Some(FavoriteView { favorite, product })
            })
            .collect();

        debug!(favorites = views.len(), "listed favorites");
        Ok(views)
    }
}
