//! Caller capability for commerce operations.
//!
//! A [`Caller`] proves who is acting and what they may do. It is only handed
//! out by [`IdentityService::resolve`](crate::services::IdentityService::resolve),
//! so holding one means the user exists in the store and the privilege flag
//! was read from their record, not from request input.

use karavan_core::UserId;

use crate::error::CommerceError;
use crate::models::User;

/// An authenticated caller and their privilege.
#[derive(Debug, Clone)]
pub struct Caller {
    user: User,
    privileged: bool,
}

impl Caller {
    /// Wrap a resolved user; privilege comes from the stored record.
    pub(crate) fn new(user: User) -> Self {
        Self {
            privileged: user.is_admin,
            user,
        }
    }

    /// The resolved user record.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// The caller's user id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Whether the caller holds the privileged role.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Reject the operation unless the caller is privileged.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Forbidden` naming the attempted action.
    pub fn require_privileged(&self, action: &str) -> Result<(), CommerceError> {
        if self.privileged {
            Ok(())
        } else {
            Err(CommerceError::Forbidden(format!(
                "{action} requires the admin role"
            )))
        }
    }
}
