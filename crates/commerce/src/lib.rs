//! Karavan commerce library.
//!
//! The consistency core of the shop: carts, checkout, and order lifecycle.
//! All state lives behind the [`store::Store`] handle, which fronts either
//! `PostgreSQL` or an in-memory backend, and every mutating operation is a
//! single atomic statement against that store. Callers are resolved through
//! [`services::IdentityService`] and carry their privilege with them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod caller;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use caller::Caller;
pub use config::{ConfigError, StoreConfig};
pub use error::{CommerceError, NotFound, StoreError};
pub use store::Store;
