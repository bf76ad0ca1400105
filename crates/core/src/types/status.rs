//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is outside the order vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid order status: {input:?}")]
pub struct InvalidOrderStatus {
    /// The rejected input.
    pub input: String,
}

/// Fulfillment state of an order.
///
/// The vocabulary is closed: every order is exactly one of these three
/// states, and transitions between them are unrestricted. Completed and
/// canceled are both terminal only by convention; an operator may move an
/// order back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, not yet handled.
    #[default]
    Pending,
    /// Order fulfilled.
    Completed,
    /// Order canceled.
    Canceled,
}

impl OrderStatus {
    /// Every status in the vocabulary.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Completed, Self::Canceled];

    /// Returns the wire form of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = InvalidOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "canceled" => Ok(Self::Canceled),
            _ => Err(InvalidOrderStatus {
                input: s.to_owned(),
            }),
        }
    }
}
