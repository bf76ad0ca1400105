//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karavan_core::{Email, ExternalUserId, UserId};

/// A shop user (domain type).
///
/// Authentication happens at an external identity provider; this record is
/// the local mirror keyed by the provider's stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Stable identifier from the identity provider.
    pub external_id: ExternalUserId,
    /// User's email address, when the provider shared one.
    pub email: Option<Email>,
    /// Display name, when the provider shared one.
    pub full_name: Option<String>,
    /// Avatar URL, when the provider shared one.
    pub picture: Option<String>,
    /// Whether the user holds the privileged role.
    pub is_admin: bool,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
    /// When the profile was last synced.
    pub updated_at: DateTime<Utc>,
}

/// Profile fields pushed by the identity provider on sign-in.
///
/// Everything except the external id is optional; absent fields clear the
/// stored value so the mirror tracks the provider exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable identifier from the identity provider.
    pub external_id: ExternalUserId,
    /// Email address.
    pub email: Option<Email>,
    /// Display name.
    pub full_name: Option<String>,
    /// Avatar URL.
    pub picture: Option<String>,
}

impl UserProfile {
    /// A profile carrying only the external id.
    #[must_use]
    pub const fn bare(external_id: ExternalUserId) -> Self {
        Self {
            external_id,
            email: None,
            full_name: None,
            picture: None,
        }
    }
}
