//! Error types for store and service operations.
//!
//! Two layers: [`StoreError`] is what a backend reports, [`CommerceError`] is
//! what a service returns. Every service failure is exactly one of five kinds
//! (validation, not found, forbidden, conflict, store failure), so an embedding
//! can map each variant to a response without inspecting message text.

use thiserror::Error;

use karavan_core::{CartLineId, ExternalUserId, OrderId, ProductId};

/// Errors reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend refused or failed to serve the request; retrying may help.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Constraint violation (e.g., duplicate external user id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// A reference that resolved to nothing, tagged with what was looked up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    /// No user with this external identifier.
    #[error("user not found: {0}")]
    User(ExternalUserId),

    /// No product with this id in the catalog.
    #[error("product not found: {0}")]
    Product(ProductId),

    /// No order with this id.
    #[error("order not found: {0}")]
    Order(OrderId),

    /// No cart line with this id.
    #[error("cart line not found: {0}")]
    CartLine(CartLineId),
}

/// Service-level error for all commerce operations.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Input was malformed or out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(#[from] NotFound),

    /// Caller lacks the privilege for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation lost a uniqueness race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed; the operation had no observable effect.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl CommerceError {
    /// Whether retrying the same operation could succeed.
    ///
    /// Only infrastructure failures qualify; validation, authorization, and
    /// missing-entity outcomes are stable until the inputs change.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Database(_) | StoreError::Unavailable(_))
        )
    }
}

impl From<StoreError> for CommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}
