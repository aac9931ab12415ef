//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    DynOrderStore, DynProductStore, DynUserStore, OrderRepository, ProductRepository,
    UserRepository,
};
use crate::payments::{DynPaymentGateway, StripeClient};
use crate::services::{
    AuthService, CartService, CatalogService, CheckoutService, InvoiceService, OrderService,
};

/// The stores every service is built from.
#[derive(Clone)]
pub struct Stores {
    pub products: DynProductStore,
    pub users: DynUserStore,
    pub orders: DynOrderStore,
}

impl Stores {
    /// `PostgreSQL` repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            products: Arc::new(ProductRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    /// Absent when the state runs on in-memory stores.
    pool: Option<PgPool>,
    products: DynProductStore,
    auth: AuthService,
    catalog: CatalogService,
    cart: CartService,
    checkout: CheckoutService,
    orders: OrderService,
    invoices: InvoiceService,
}

impl AppState {
    /// Build the production state: `PostgreSQL` stores and the Stripe gateway.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let stores = Stores::postgres(&pool);
        let gateway: DynPaymentGateway = Arc::new(StripeClient::new(&config.stripe));
        Self::from_parts(config, stores, gateway, Some(pool))
    }

    /// Wire services from explicit stores and gateway.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        stores: Stores,
        gateway: DynPaymentGateway,
        pool: Option<PgPool>,
    ) -> Self {
        let currency = config.stripe.currency;

        let auth = AuthService::new(Arc::clone(&stores.users));
        let catalog = CatalogService::new(Arc::clone(&stores.products), config.catalog.page_size);
        let cart = CartService::new(Arc::clone(&stores.products), Arc::clone(&stores.users));
        let checkout = CheckoutService::new(cart.clone(), gateway, currency);
        let orders = OrderService::new(cart.clone(), Arc::clone(&stores.users), stores.orders);
        let invoices = InvoiceService::new(orders.clone(), config.invoice_dir.clone(), currency);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                products: stores.products,
                auth,
                catalog,
                cart,
                checkout,
                orders,
                invoices,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The database pool, if the state is backed by `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Raw product store, used by the admin delete endpoint.
    #[must_use]
    pub fn products(&self) -> &DynProductStore {
        &self.inner.products
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn invoices(&self) -> &InvoiceService {
        &self.inner.invoices
    }
}
