//! Domain models for the commerce core.
//!
//! Persisted records (`User`, `Product`, `CartLine`, `Order`, `Favorite`)
//! mirror store rows exactly. View types (`CartView`, `OrderView`) join those
//! records with the catalog for display and never hit the store themselves.

pub mod cart;
pub mod favorite;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{CartLine, CartLineChange, CartLineView, CartView};
pub use favorite::{Favorite, FavoriteChange, FavoriteView};
pub use order::{AdminOrderView, NewOrder, Order, OrderItem, OrderItemView, OrderView};
pub use product::{NewProduct, Product};
pub use user::{User, UserProfile};
