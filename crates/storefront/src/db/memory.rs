//! In-memory store used by service and route tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use bazaar_core::{Cart, Email, OrderId, ProductId, UserId};

use super::{
    DynOrderStore, DynProductStore, DynUserStore, OrderStore, ProductStore, RepositoryError,
    UserStore,
};
use crate::models::{NewOrder, Order, Product, User};

#[derive(Default)]
struct Inner {
    products: BTreeMap<ProductId, Product>,
    users: HashMap<UserId, (User, Option<String>)>,
    orders: Vec<Order>,
    next_product_id: i32,
    next_user_id: i32,
    next_order_id: i32,
}

/// A process-local store implementing every store trait.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    fail_order_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The same store behind each trait object.
    #[must_use]
    pub fn as_stores(&self) -> (DynProductStore, DynUserStore, DynOrderStore) {
        (
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    /// Make every subsequent `OrderStore::create` fail.
    pub fn fail_order_writes(&self, fail: bool) {
        self.fail_order_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn insert_product(&self, title: &str, price: Decimal) -> Product {
        let mut inner = self.inner.lock().await;
        inner.next_product_id += 1;
        let product = Product {
            id: ProductId::new(inner.next_product_id),
            title: title.to_owned(),
            price,
            description: format!("{title} description"),
            image_url: format!("/static/images/{}.png", title.to_lowercase()),
        };
        inner.products.insert(product.id, product.clone());
        product
    }

    pub async fn update_product_price(&self, id: ProductId, price: Decimal) {
        if let Some(product) = self.inner.lock().await.products.get_mut(&id) {
            product.price = price;
        }
    }

    /// Insert a user without a password.
    pub async fn insert_user(&self, email: &str) -> User {
        let mut inner = self.inner.lock().await;
        inner.next_user_id += 1;
        let user = User {
            id: UserId::new(inner.next_user_id),
            email: Email::parse(email).unwrap_or_else(|e| panic!("bad test email {email}: {e}")),
            cart: Cart::new(),
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, (user.clone(), None));
        user
    }

    /// The stored cart of a user, empty if the user is unknown.
    pub async fn cart_of(&self, id: UserId) -> Cart {
        self.inner
            .lock()
            .await
            .users
            .get(&id)
            .map(|(u, _)| u.cart.clone())
            .unwrap_or_default()
    }

    /// Every stored order, oldest first.
    pub async fn orders(&self) -> Vec<Order> {
        self.inner.lock().await.orders.clone()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.inner.lock().await.products.len() as u64)
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(inner
            .products
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.products.remove(&id).is_none() {
            return Ok(false);
        }
        for (user, _) in inner.users.values_mut() {
            user.cart.remove(id);
        }
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .users
            .get(&id)
            .map(|(u, _)| u.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find_map(|(u, hash)| {
            if &u.email == email {
                hash.clone().map(|h| (u.clone(), h))
            } else {
                None
            }
        }))
    }

    async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        inner.next_user_id += 1;
        let user = User {
            id: UserId::new(inner.next_user_id),
            email: email.clone(),
            cart: Cart::new(),
            created_at: Utc::now(),
        };
        inner
            .users
            .insert(user.id, (user.clone(), Some(password_hash.to_owned())));
        Ok(user)
    }

    async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let (user, _) = inner
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;
        user.cart = cart.clone();
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        if self.fail_order_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut inner = self.inner.lock().await;
        inner.next_order_id += 1;
        let stored = Order {
            id: OrderId::new(inner.next_order_id),
            user: order.user.clone(),
            lines: order.lines.clone(),
            created_at: Utc::now(),
        };
        inner.orders.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter(|o| o.is_owned_by(user_id))
            .cloned()
            .collect())
    }
}
