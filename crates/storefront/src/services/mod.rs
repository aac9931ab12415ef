//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email and password accounts
//! - `catalog` - Paginated product listings and product detail
//! - `cart` - Cart mutation and resolution against the catalog
//! - `checkout` - Hosted payment sessions for the cart
//! - `orders` - Turning carts into immutable orders, order history
//! - `invoice` - PDF invoices for placed orders
//!
//! Services hold trait-object stores (see [`crate::db`]) and are cheap to
//! clone into handlers.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod invoice;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use cart::{CartLine, CartService, ResolvedCart};
pub use catalog::{CatalogService, ProductPage};
pub use checkout::{CheckoutService, CheckoutSummary};
pub use error::ShopError;
pub use invoice::{Invoice, InvoiceError, InvoiceService};
pub use orders::{OrderService, OrderSnapshot};
