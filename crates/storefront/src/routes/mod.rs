//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                          - Shop index (paginated, ?page=)
//! GET    /health                    - Liveness
//! GET    /health/ready              - Readiness (database ping)
//!
//! # Catalog
//! GET    /products                  - Product listing (?page=)
//! GET    /products/{productId}      - Product detail
//!
//! # Cart (requires auth)
//! GET    /cart                      - Cart page
//! POST   /cart                      - Add one unit (productId, _csrf)
//! POST   /cart-delete-item          - Remove an entry (productId, _csrf)
//!
//! # Checkout and orders (requires auth)
//! GET    /checkout                  - Open a payment session, confirmation page
//! GET    /checkout/success          - Payment done: place the order
//! GET    /checkout/cancel           - Payment abandoned: redirect to /checkout
//! POST   /create-order              - Place the order directly (_csrf)
//! GET    /orders                    - Order history
//! GET    /orders/{orderId}          - Invoice PDF (owner only)
//!
//! # Admin (requires auth)
//! GET    /admin/products            - Product list with delete buttons
//! DELETE /admin/product/{productId} - JSON delete (csrf-token header)
//!
//! # Auth
//! GET    /login, POST /login        - Email/password login
//! GET    /signup, POST /signup      - Account creation
//! POST   /logout                    - End the session
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod shop;

use axum::{
    Router,
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use bazaar_core::{CurrencyCode, Price};

use crate::error::AppError;
use crate::middleware::{
    CsrfToken, OptionalAuth, SessionLayer, auth_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::models::{CurrentUser, Product};
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Data every page template needs for the layout.
#[derive(Clone, Debug)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub csrf_token: String,
}

impl PageContext {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(OptionalAuth(user)) = OptionalAuth::from_request_parts(parts, state).await;
        let CsrfToken(csrf_token) = CsrfToken::from_request_parts(parts, state).await?;
        Ok(Self { user, csrf_token })
    }
}

/// Product display data for templates.
#[derive(Clone, Debug)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            price: product.price_in(currency).to_string(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Format an amount in the shop currency.
#[must_use]
pub fn money(amount: rust_decimal::Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).to_string()
}

/// Scheme and host the client used to reach us, e.g. `https://shop.example`.
///
/// Uses `X-Forwarded-Proto` (default `http`) and `Host`; without a usable
/// `Host` header the configured base URL is returned.
#[must_use]
pub fn request_origin(headers: &HeaderMap, fallback: &str) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty() && !h.contains(['/', ' ']));

    let Some(host) = host else {
        return fallback.trim_end_matches('/').to_owned();
    };

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| matches!(*s, "http" | "https"))
        .unwrap_or("http");

    format!("{scheme}://{host}")
}

/// Parse a path id, treating garbage as an unknown resource.
pub(crate) fn parse_path_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{what} {raw}")))
}

/// Create all page and action routes.
pub fn routes() -> Router<AppState> {
    let credential_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/", get(shop::index))
        .route("/products", get(shop::products))
        .route("/products/{product_id}", get(shop::product_detail))
        .route("/cart", get(cart::show).post(cart::add))
        .route("/cart-delete-item", post(cart::delete_item))
        .route("/checkout", get(checkout::show))
        .route("/checkout/success", get(checkout::success))
        .route("/checkout/cancel", get(checkout::cancel))
        .route("/create-order", post(orders::create))
        .route("/orders", get(orders::index))
        .route("/orders/{order_id}", get(orders::invoice))
        .route("/admin/products", get(admin::products))
        .route("/admin/product/{product_id}", delete(admin::delete_product))
        .merge(credential_routes)
        .route("/logout", post(auth::logout))
}

/// Assemble the full application with middleware.
pub fn app<S>(state: AppState, session_layer: SessionLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use axum::response::Response;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;
    use crate::db::memory::MemoryStore;
    use crate::payments::fake::FakeGateway;
    use crate::state::Stores;

    #[test]
    fn test_origin_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("shop.example:8080"));
        assert_eq!(
            request_origin(&headers, "https://fallback.example"),
            "http://shop.example:8080"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            request_origin(&headers, "https://fallback.example"),
            "https://shop.example:8080"
        );
    }

    #[test]
    fn test_origin_falls_back_to_base_url() {
        let headers = HeaderMap::new();
        assert_eq!(
            request_origin(&headers, "https://fallback.example/"),
            "https://fallback.example"
        );

        let mut bogus = HeaderMap::new();
        bogus.insert(header::HOST, HeaderValue::from_static("evil.example/path"));
        assert_eq!(
            request_origin(&bogus, "https://fallback.example"),
            "https://fallback.example"
        );
    }

    pub(crate) struct TestApp {
        pub store: MemoryStore,
        pub router: Router,
        pub gateway: Arc<FakeGateway>,
        /// Invoice directory; removed when the app is dropped.
        pub invoice_dir: tempfile::TempDir,
    }

    pub(crate) async fn test_app() -> TestApp {
        let store = MemoryStore::new();
        store.insert_product("Mug", Decimal::from(10)).await;
        store.insert_product("Spoon", Decimal::from(5)).await;
        store.insert_product("Bowl", Decimal::from(12)).await;

        let (products, users, orders) = store.as_stores();
        let invoice_dir = tempfile::tempdir().expect("tempdir");
        let mut config = test_config();
        config.invoice_dir = invoice_dir.path().to_path_buf();
        let session_layer =
            crate::middleware::session::configure(tower_sessions::MemoryStore::default(), &config)
                .expect("session layer");
        let gateway = Arc::new(FakeGateway::default());
        let state = AppState::from_parts(
            config,
            Stores {
                products,
                users,
                orders,
            },
            gateway.clone(),
            None,
        );

        TestApp {
            store,
            router: app(state, session_layer),
            gateway,
            invoice_dir,
        }
    }

    pub(crate) async fn get(router: &Router, uri: &str) -> (StatusCode, HeaderMap, String) {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, headers, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, headers, body) = get(&app.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers.get("x-frame-options").map(HeaderValue::as_bytes), Some(&b"DENY"[..]));

        let (status, _, _) = get(&app.router, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_listing_pages() {
        let app = test_app().await;

        // test_config uses two products per page
        let (status, _, body) = get(&app.router, "/products").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Mug"));
        assert!(body.contains("Spoon"));
        assert!(!body.contains("Bowl"));
        assert!(body.contains("?page=2"));

        let (_, _, body) = get(&app.router, "/?page=2").await;
        assert!(body.contains("Bowl"));
        assert!(!body.contains("Spoon"));

        let (status, _, body) = get(&app.router, "/products?page=banana").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Mug"));
    }

    #[tokio::test]
    async fn test_product_detail() {
        let app = test_app().await;
        let (status, _, body) = get(&app.router, "/products/1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Mug"));
        assert!(body.contains("$10.00"));

        let (status, _, _) = get(&app.router, "/products/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = get(&app.router, "/products/not-a-number").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_protected_pages_redirect_to_login() {
        let app = test_app().await;
        for uri in [
            "/cart",
            "/checkout",
            "/checkout/cancel",
            "/orders",
            "/orders/1",
            "/admin/products",
        ] {
            let (status, headers, _) = get(&app.router, uri).await;
            assert_eq!(status, StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(
                headers.get(header::LOCATION).map(HeaderValue::as_bytes),
                Some(&b"/login"[..]),
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_admin_delete_requires_session() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(
                Request::delete("/admin/product/1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(crate::db::ProductStore::count(&app.store).await.ok(), Some(3));
    }

    /// Carries the session cookie between requests like a browser would.
    struct Browser {
        router: Router,
        cookie: Option<String>,
    }

    impl Browser {
        fn new(router: &Router) -> Self {
            Self {
                router: router.clone(),
                cookie: None,
            }
        }

        async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response {
            let mut builder = builder.header("x-forwarded-for", "203.0.113.9");
            if let Some(cookie) = &self.cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).expect("request"))
                .await
                .expect("response");
            if let Some(set) = response
                .headers()
                .get(header::SET_COOKIE)
                .and_then(|v| v.to_str().ok())
            {
                self.cookie = set.split(';').next().map(str::to_owned);
            }
            response
        }

        async fn get(&mut self, uri: &str) -> (StatusCode, HeaderMap, String) {
            let response = self.send(Request::get(uri), Body::empty()).await;
            let status = response.status();
            let headers = response.headers().clone();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body");
            (status, headers, String::from_utf8_lossy(&body).into_owned())
        }

        async fn post(&mut self, uri: &str, form: &str) -> Response {
            self.send(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
                Body::from(form.to_owned()),
            )
            .await
        }
    }

    fn csrf_from(html: &str) -> String {
        let marker = r#"name="csrf-token" content=""#;
        let start = html.find(marker).expect("csrf meta") + marker.len();
        html.get(start..)
            .and_then(|rest| rest.split('"').next())
            .expect("csrf value")
            .to_owned()
    }

    fn location(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_shopping_flow() {
        let app = test_app().await;
        let mut browser = Browser::new(&app.router);

        let (status, _, body) = browser.get("/signup").await;
        assert_eq!(status, StatusCode::OK);
        let csrf = csrf_from(&body);

        let response = browser
            .post(
                "/signup",
                &format!(
                    "email=ada%40example.com&password=hunter2hunter2&confirmPassword=hunter2hunter2&_csrf={csrf}"
                ),
            )
            .await;
        assert_eq!(location(&response), Some("/login"));

        // Wrong password re-renders the form.
        let response = browser
            .post(
                "/login",
                &format!("email=ada%40example.com&password=nope-nope&_csrf={csrf}"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = browser
            .post(
                "/login",
                &format!("email=ada%40example.com&password=hunter2hunter2&_csrf={csrf}"),
            )
            .await;
        assert_eq!(location(&response), Some("/"));

        // A forged form is rejected.
        let response = browser.post("/cart", "productId=1&_csrf=forged").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        for id in [1, 2, 1] {
            let response = browser
                .post("/cart", &format!("productId={id}&_csrf={csrf}"))
                .await;
            assert_eq!(location(&response), Some("/cart"));
        }

        let (status, _, body) = browser.get("/cart").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Mug"));
        assert!(body.contains("Quantity: 2"));
        assert!(body.contains("$25.00"));

        let (status, _, body) = browser.get("/checkout").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("https://checkout.test/pay/"));
        assert_eq!(app.gateway.request_count().await, 1);

        // Backing out of the hosted page returns to checkout without
        // opening a session of its own.
        let (status, headers, _) = browser.get("/checkout/cancel").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            headers.get(header::LOCATION).map(HeaderValue::as_bytes),
            Some(&b"/checkout"[..])
        );
        assert_eq!(app.gateway.request_count().await, 1);

        let response = browser
            .post("/create-order", &format!("_csrf={csrf}"))
            .await;
        assert_eq!(location(&response), Some("/orders"));
        assert_eq!(app.store.orders().await.len(), 1);

        let (_, _, body) = browser.get("/cart").await;
        assert!(body.contains("No products in cart!"));

        let (_, _, body) = browser.get("/orders").await;
        assert!(body.contains(r#"href="/orders/1""#));
        assert!(body.contains("Spoon"));

        let (status, headers, body) = browser.get("/orders/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers.get(header::CONTENT_TYPE).map(HeaderValue::as_bytes),
            Some(&b"application/pdf"[..])
        );
        assert!(body.starts_with("%PDF"));

        let (status, _, _) = browser.get("/orders/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let saved = std::fs::read(app.invoice_dir.path().join("invoice-1.pdf")).expect("saved");
        assert!(saved.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_tampered_session_cookie_is_ignored() {
        let app = test_app().await;
        let mut browser = Browser::new(&app.router);

        let (_, _, body) = browser.get("/signup").await;
        let csrf = csrf_from(&body);
        browser
            .post(
                "/signup",
                &format!(
                    "email=eve%40example.com&password=hunter2hunter2&confirmPassword=hunter2hunter2&_csrf={csrf}"
                ),
            )
            .await;
        browser
            .post(
                "/login",
                &format!("email=eve%40example.com&password=hunter2hunter2&_csrf={csrf}"),
            )
            .await;

        let (status, _, _) = browser.get("/cart").await;
        assert_eq!(status, StatusCode::OK);

        // The cookie value is `<signature><session id>`; swap the last
        // character so the signature no longer matches.
        let cookie = browser.cookie.clone().expect("session cookie");
        assert!(cookie.starts_with("bazaar_session="));
        let mut forged = cookie.clone();
        let last = forged.pop().expect("non-empty");
        forged.push(if last == 'A' { 'B' } else { 'A' });
        browser.cookie = Some(forged);

        let (status, headers, _) = browser.get("/cart").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            headers.get(header::LOCATION).map(HeaderValue::as_bytes),
            Some(&b"/login"[..])
        );
    }

    #[tokio::test]
    async fn test_admin_delete_flow() {
        let app = test_app().await;
        let mut browser = Browser::new(&app.router);

        let (_, _, body) = browser.get("/signup").await;
        let csrf = csrf_from(&body);
        browser
            .post(
                "/signup",
                &format!(
                    "email=root%40example.com&password=hunter2hunter2&confirmPassword=hunter2hunter2&_csrf={csrf}"
                ),
            )
            .await;
        browser
            .post(
                "/login",
                &format!("email=root%40example.com&password=hunter2hunter2&_csrf={csrf}"),
            )
            .await;

        let (status, _, body) = browser.get("/admin/products").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/static/js/admin.js"));
        assert!(body.contains("Bowl"));

        let response = browser
            .send(
                Request::delete("/admin/product/1").header("csrf-token", "forged"),
                Body::empty(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = browser
            .send(
                Request::delete("/admin/product/1").header("csrf-token", &csrf),
                Body::empty(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], br#"{"message":"Success!"}"#);

        let response = browser
            .send(
                Request::delete("/admin/product/1").header("csrf-token", &csrf),
                Body::empty(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let (status, _, _) = browser.get("/products/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
