//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the row types the
//! repositories decode. Pure rules (cart mutation, totals) live in
//! `bazaar_core`; these types attach them to persisted entities.

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order, OrderUser};
pub use product::Product;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
