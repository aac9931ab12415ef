//! User domain type.

use bazaar_core::{Cart, Email, UserId};
use chrono::{DateTime, Utc};

/// A storefront account together with its cart.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// In-progress cart, in insertion order.
    pub cart: Cart,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
