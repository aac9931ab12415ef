//! Placed orders.

use bazaar_core::{Email, OrderId, OrderLine, UserId, order_total};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The customer an order is attributed to, copied onto the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUser {
    pub user_id: UserId,
    pub email: Email,
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user: OrderUser,
    pub lines: Vec<OrderLine>,
}

/// A persisted, immutable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: OrderUser,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of `quantity * price` over the snapshot lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        order_total(&self.lines)
    }

    /// Whether `user_id` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user.user_id == user_id
    }
}
