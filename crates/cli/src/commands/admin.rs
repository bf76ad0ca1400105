//! Admin role management.
//!
//! Privilege is a flag on the synced user record, so the user must have
//! signed in at least once before a role change can find them.
//!
//! # Usage
//!
//! ```bash
//! karavan admin grant --external-id user_2x9PqLmT
//! karavan admin revoke --external-id user_2x9PqLmT
//! ```
//!
//! # Environment Variables
//!
//! - `KARAVAN_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use karavan_commerce::{ConfigError, Store, StoreConfig, StoreError};
use karavan_core::ExternalUserId;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while changing a user's role.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Configuration failed to load.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The store rejected the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No synced user carries this external id.
    #[error("No synced user with external id: {0}. The user must sign in once first.")]
    UnknownUser(String),
}

/// Set or clear the admin flag on a synced user.
///
/// # Errors
///
/// Returns `AdminError::UnknownUser` if the external id has never synced,
/// or a configuration/store error otherwise.
pub async fn set_role(external_id: &str, is_admin: bool) -> Result<(), AdminError> {
    let config = StoreConfig::from_env()?;
    let store = Store::connect(&config).await?;

    let external_id = ExternalUserId::new(external_id);
    let updated = store.set_admin(&external_id, is_admin).await?;

    store.close().await;

    match updated {
        Some(user) => {
            info!(user_id = %user.id, is_admin, "Updated admin role");
            Ok(())
        }
        None => Err(AdminError::UnknownUser(external_id.into_inner())),
    }
}
