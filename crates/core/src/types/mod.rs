//! Core types for Karavan.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError, MAX_EMAIL_LENGTH};
pub use id::*;
pub use price::{CurrencyCode, InvalidCurrencyCode, Price};
pub use status::{InvalidOrderStatus, OrderStatus};
