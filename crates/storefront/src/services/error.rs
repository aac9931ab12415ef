//! Errors raised by the shop services.

use thiserror::Error;

use bazaar_core::{OrderId, ProductId, UserId};

use super::invoice::InvoiceError;
use crate::db::RepositoryError;
use crate::payments::PaymentError;

/// Failures of catalog, cart, checkout, order and invoice operations.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The session points at a user that no longer exists.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("order {order} does not belong to user {user}")]
    NotOrderOwner { order: OrderId, user: UserId },

    /// Checkout was requested with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("payment processor error: {0}")]
    Payment(#[from] PaymentError),

    #[error("invoice error: {0}")]
    Invoice(#[from] InvoiceError),
}
