//! Database access for the storefront.
//!
//! # Database: `bazaar_storefront`
//!
//! ## Tables (schema `storefront`)
//!
//! - `product` - Catalog
//! - `user`, `user_password` - Accounts
//! - `cart_item` - Each user's cart, ordered by `position`
//! - `order`, `order_line` - Placed orders with copied product fields
//! - `tower_sessions.session` - Session storage
//!
//! # Seams
//!
//! Services depend on the [`ProductStore`], [`UserStore`] and [`OrderStore`]
//! traits, never on `PgPool` directly. The `PostgreSQL` repositories are the
//! production implementations; [`memory::MemoryStore`] backs the tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod orders;
pub mod products;
pub mod users;

#[cfg(test)]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{Cart, Email, OrderId, ProductId, UserId};

use crate::models::{NewOrder, Order, Product, User};

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors returned by every store implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying database call failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row to update or delete does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data failed validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

pub type DynProductStore = Arc<dyn ProductStore + Send + Sync>;
pub type DynUserStore = Arc<dyn UserStore + Send + Sync>;
pub type DynOrderStore = Arc<dyn OrderStore + Send + Sync>;

/// Read access to the catalog, plus the admin delete.
#[async_trait]
pub trait ProductStore {
    /// Total number of products.
    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Products ordered by id, skipping `offset` and returning at most `limit`.
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Product>, RepositoryError>;

    /// One product by id.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// All products whose id is in `ids`, in no particular order. Missing ids are skipped.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Delete a product. Returns `false` if it did not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Accounts and their carts.
#[async_trait]
pub trait UserStore {
    /// Load a user and their cart.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Load a user and their password hash by email.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user with a password hash.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Replace the user's stored cart with `cart`.
    ///
    /// Last write wins: concurrent saves for the same user are not merged.
    async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Placed orders.
#[async_trait]
pub trait OrderStore {
    /// Persist a new order and its lines atomically.
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// One order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-violation into `RepositoryError::Conflict`.
pub(crate) fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Convert a stored `INTEGER` quantity back into a positive count.
pub(crate) fn quantity_from_db(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid quantity {value}")))
}

/// Convert a quantity into the `INTEGER` column type.
pub(crate) fn quantity_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {value} out of range")))
}
