//! Order materialization and history.
//!
//! Finalizing copies the resolved cart into an immutable order and then
//! empties the cart. It is deliberately not idempotent: calling it again
//! after the cart was cleared stores an order with no lines, and two calls
//! that both read the cart before either clears it store two full orders.

use tracing::instrument;

use bazaar_core::{Cart, OrderId, UserId};

use super::ShopError;
use super::cart::CartService;
use crate::db::{DynOrderStore, DynUserStore};
use crate::models::{NewOrder, Order, OrderUser};

/// A cart frozen into order lines, not yet persisted.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    order: NewOrder,
}

impl OrderSnapshot {
    #[must_use]
    pub const fn order(&self) -> &NewOrder {
        &self.order
    }
}

#[derive(Clone)]
pub struct OrderService {
    cart: CartService,
    users: DynUserStore,
    orders: DynOrderStore,
}

impl OrderService {
    #[must_use]
    pub const fn new(cart: CartService, users: DynUserStore, orders: DynOrderStore) -> Self {
        Self {
            cart,
            users,
            orders,
        }
    }

    /// Read the user's cart and copy each line's product fields.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::UserNotFound` if the user is gone.
    pub async fn snapshot(&self, user_id: UserId) -> Result<OrderSnapshot, ShopError> {
        let user = self.cart.load_user(user_id).await?;
        let resolved = self.cart.resolve(&user.cart).await?;

        let lines = resolved
            .lines
            .iter()
            .map(|line| bazaar_core::OrderLine {
                quantity: line.quantity,
                product: line.product.snapshot(),
            })
            .collect();

        Ok(OrderSnapshot {
            order: NewOrder {
                user: OrderUser {
                    user_id: user.id,
                    email: user.email,
                },
                lines,
            },
        })
    }

    /// Persist a snapshot, then clear the owner's cart.
    ///
    /// The cart is only cleared once the order is stored; if the write
    /// fails the cart is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if either write fails.
    pub async fn commit(&self, snapshot: OrderSnapshot) -> Result<Order, ShopError> {
        let order = self.orders.create(&snapshot.order).await?;
        self.users
            .save_cart(order.user.user_id, &Cart::new())
            .await?;

        tracing::info!(
            order_id = %order.id,
            lines = order.lines.len(),
            total = %order.total(),
            "Order placed"
        );
        Ok(order)
    }

    /// Snapshot the cart into a new order and clear the cart.
    ///
    /// # Errors
    ///
    /// See [`Self::snapshot`] and [`Self::commit`].
    #[instrument(skip(self))]
    pub async fn finalize_order(&self, user_id: UserId) -> Result<Order, ShopError> {
        let snapshot = self.snapshot(user_id).await?;
        self.commit(snapshot).await
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, ShopError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Load an order on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::OrderNotFound` for an unknown id and
    /// `ShopError::NotOrderOwner` when someone else placed it.
    pub async fn get_owned_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, ShopError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound(order_id))?;

        if !order.is_owned_by(user_id) {
            return Err(ShopError::NotOrderOwner {
                order: order_id,
                user: user_id,
            });
        }

        Ok(order)
    }
}
