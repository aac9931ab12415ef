//! Cart reads and mutations.
//!
//! The cart is stored on the user. Every mutation loads the user, edits the
//! [`Cart`] value and writes the whole cart back. There is no locking, so two
//! concurrent edits for one user resolve as last write wins.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::instrument;

use bazaar_core::{Cart, ProductId, UserId};

use super::ShopError;
use crate::db::{DynProductStore, DynUserStore};
use crate::models::{Product, User};

/// A cart entry joined with its current product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// A user's cart with every entry resolved to a product, in cart order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCart {
    pub lines: Vec<CartLine>,
}

impl ResolvedCart {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[derive(Clone)]
pub struct CartService {
    products: DynProductStore,
    users: DynUserStore,
}

impl CartService {
    #[must_use]
    pub const fn new(products: DynProductStore, users: DynUserStore) -> Self {
        Self { products, users }
    }

    pub(crate) async fn load_user(&self, user_id: UserId) -> Result<User, ShopError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(ShopError::UserNotFound(user_id))
    }

    /// Add one unit of a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, ShopError> {
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound(product_id))?;

        let mut user = self.load_user(user_id).await?;
        user.cart.add(product.id);
        self.users.save_cart(user.id, &user.cart).await?;

        tracing::debug!(quantity = user.cart.quantity_of(product.id), "Added to cart");
        Ok(user.cart)
    }

    /// Remove a product's entry from the user's cart. Absent entries are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, ShopError> {
        let mut user = self.load_user(user_id).await?;
        if user.cart.remove(product_id) {
            self.users.save_cart(user.id, &user.cart).await?;
        }
        Ok(user.cart)
    }

    /// The user's cart resolved to products.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::UserNotFound` if the user is gone.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<ResolvedCart, ShopError> {
        let user = self.load_user(user_id).await?;
        self.resolve(&user.cart).await
    }

    /// Join cart entries with their products. Entries whose product no
    /// longer exists are dropped.
    pub(crate) async fn resolve(&self, cart: &Cart) -> Result<ResolvedCart, ShopError> {
        if cart.is_empty() {
            return Ok(ResolvedCart::default());
        }

        let mut products: HashMap<ProductId, Product> = self
            .products
            .get_many(&cart.product_ids())
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(cart.entries().len());
        for entry in cart.entries() {
            match products.remove(&entry.product_id) {
                Some(product) => lines.push(CartLine {
                    product,
                    quantity: entry.quantity,
                }),
                None => tracing::warn!(
                    product_id = %entry.product_id,
                    "Dropping cart entry for missing product"
                ),
            }
        }

        Ok(ResolvedCart { lines })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::MemoryStore;

    async fn setup() -> (MemoryStore, CartService, UserId, Product, Product) {
        let store = MemoryStore::new();
        let x = store.insert_product("X", Decimal::from(10)).await;
        let y = store.insert_product("Y", Decimal::from(5)).await;
        let user = store.insert_user("shopper@example.com").await;
        let service = CartService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        (store, service, user.id, x, y)
    }

    #[tokio::test]
    async fn test_add_twice_then_remove() {
        let (store, cart, user, x, _) = setup().await;

        cart.add_to_cart(user, x.id).await.expect("add");
        cart.add_to_cart(user, x.id).await.expect("add");

        let stored = store.cart_of(user).await;
        assert_eq!(stored.entries().len(), 1);
        assert_eq!(stored.quantity_of(x.id), 2);

        cart.remove_from_cart(user, x.id).await.expect("remove");
        assert!(store.cart_of(user).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (store, cart, user, x, y) = setup().await;
        cart.add_to_cart(user, x.id).await.expect("add");

        let after = cart.remove_from_cart(user, y.id).await.expect("remove");
        assert_eq!(after.quantity_of(x.id), 1);
        assert_eq!(store.cart_of(user).await, after);
    }

    #[tokio::test]
    async fn test_add_missing_product_is_not_found() {
        let (store, cart, user, _, _) = setup().await;
        let err = cart
            .add_to_cart(user, ProductId::new(99))
            .await
            .expect_err("missing");
        assert!(matches!(err, ShopError::ProductNotFound(_)));
        assert!(store.cart_of(user).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_cart_keeps_order_and_totals() {
        let (_, cart, user, x, y) = setup().await;
        cart.add_to_cart(user, y.id).await.expect("add");
        cart.add_to_cart(user, x.id).await.expect("add");
        cart.add_to_cart(user, x.id).await.expect("add");

        let resolved = cart.get_cart(user).await.expect("cart");
        let titles: Vec<_> = resolved.lines.iter().map(|l| l.product.title.as_str()).collect();
        assert_eq!(titles, ["Y", "X"]);
        assert_eq!(resolved.lines[1].line_total(), Decimal::from(20));
        assert_eq!(resolved.total(), Decimal::from(25));
        assert_eq!(resolved.item_count(), 3);
    }

    #[tokio::test]
    async fn test_dangling_entries_are_dropped() {
        let (store, cart, user, x, y) = setup().await;
        cart.add_to_cart(user, x.id).await.expect("add");
        cart.add_to_cart(user, y.id).await.expect("add");

        // bypass the cascade to simulate a stale cart row
        let mut stale = store.cart_of(user).await;
        stale.add(ProductId::new(77));
        crate::db::UserStore::save_cart(&store, user, &stale)
            .await
            .expect("save");

        let resolved = cart.get_cart(user).await.expect("cart");
        assert_eq!(resolved.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (_, cart, _, _, _) = setup().await;
        let err = cart.get_cart(UserId::new(404)).await.expect_err("no user");
        assert!(matches!(err, ShopError::UserNotFound(_)));
    }
}
