//! Core types for Bazaar.
//!
//! Type-safe wrappers and value objects for the storefront domain.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod pagination;
pub mod price;

pub use cart::{Cart, CartEntry};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{OrderLine, ProductSnapshot, order_total};
pub use pagination::{PageRequest, Pagination};
pub use price::{CurrencyCode, Price};
