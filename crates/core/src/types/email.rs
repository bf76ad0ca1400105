//! Email address value type with validation.

use serde::{Deserialize, Serialize};

/// Maximum allowed length of an email address, per RFC 5321.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Errors that can occur when parsing an email address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    /// The email address is empty.
    #[error("email address cannot be empty")]
    Empty,

    /// The email address exceeds the maximum allowed length.
    #[error("email address exceeds maximum length of {max} characters")]
    TooLong {
        /// The maximum allowed length.
        max: usize,
    },

    /// The email address is missing the @ symbol.
    #[error("email address must contain an @ symbol")]
    MissingAtSymbol,

    /// The local part (before @) is empty.
    #[error("email address local part cannot be empty")]
    EmptyLocalPart,

    /// The domain part (after @) is empty.
    #[error("email address domain cannot be empty")]
    EmptyDomain,
}

/// A validated email address.
///
/// Identity providers hand us the address pre-verified, but it still passes
/// through [`Email::parse`] on the way in so that a stored value is always
/// structurally sound. Validation is deliberately light: non-empty local part
/// and domain around a single split on `@`, within the RFC length limit.
///
/// # Example
///
/// ```rust
/// use karavan_core::Email;
///
/// let email = Email::parse("shopper@example.com").unwrap();
/// assert_eq!(email.as_str(), "shopper@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parses and validates an email address.
    ///
    /// The input is trimmed and lowercased before validation, so
    /// `" Shopper@Example.COM "` and `"shopper@example.com"` compare equal
    /// after parsing.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] if the input is empty, too long, or not of
    /// the form `local@domain` with both parts non-empty.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let normalized = input.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }

        if normalized.len() > MAX_EMAIL_LENGTH {
            return Err(EmailError::TooLong {
                max: MAX_EMAIL_LENGTH,
            });
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(EmailError::MissingAtSymbol);
        };

        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }

        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(normalized))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the email and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Email::parse(&s).map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
