//! Identity sync and caller resolution.
//!
//! Authentication lives at an external identity provider; this service keeps
//! the local user mirror in sync and turns a provider id into a [`Caller`]
//! capability for the other services. Unknown identifiers fail resolution
//! rather than being silently provisioned; provisioning is the provider-driven
//! [`sync_profile`](IdentityService::sync_profile) push.

use tracing::{debug, info, instrument, warn};

use karavan_core::ExternalUserId;

use crate::caller::Caller;
use crate::error::{CommerceError, NotFound};
use crate::models::UserProfile;
use crate::store::Store;

/// Caller resolution and profile sync against the user mirror.
pub struct IdentityService<'a> {
    store: &'a Store,
}

impl<'a> IdentityService<'a> {
    /// Create a new identity service.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Resolve an external identifier to a caller capability.
    ///
    /// Privilege on the returned caller comes from the stored record, never
    /// from request input.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if no user carries this external id.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self), fields(external_id = %external_id))]
    pub async fn resolve(&self, external_id: &ExternalUserId) -> Result<Caller, CommerceError> {
        let user = self
            .store
            .backend()
            .user_by_external_id(external_id)
            .await?
            .ok_or_else(|| NotFound::User(external_id.clone()))?;

        debug!(user_id = %user.id, privileged = user.is_admin, "resolved caller");
        Ok(Caller::new(user))
    }

    /// Upsert the local mirror from a provider profile push.
    ///
    /// Idempotent per external id: the first sync creates the user, later
    /// syncs overwrite the profile fields. The privilege flag is never
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Validation` if the external id is blank.
    /// Returns `CommerceError::Store` if the store fails.
    #[instrument(skip(self, profile), fields(external_id = %profile.external_id))]
    pub async fn sync_profile(&self, profile: &UserProfile) -> Result<Caller, CommerceError> {
        if profile.external_id.as_str().trim().is_empty() {
            warn!("rejected profile sync with a blank external id");
            return Err(CommerceError::Validation(
                "external id must not be blank".to_owned(),
            ));
        }

        let user = self.store.backend().upsert_user(profile).await?;
        info!(user_id = %user.id, "synced user profile");
        Ok(Caller::new(user))
    }
}
