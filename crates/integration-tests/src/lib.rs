//! Integration tests for Bazaar.
//!
//! These run against a live storefront and its database:
//!
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! cargo run -p bazaar-storefront &
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_TEST_URL` - Storefront origin (default: `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Used to insert fixture products

use bazaar_core::ProductId;
use bazaar_storefront::db::{ProductRepository, create_pool};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::SecretString;

/// Password used for every account these tests create.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Storefront origin under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_owned())
        .trim_end_matches('/')
        .to_owned()
}

/// Pull the anti-forgery token out of a rendered page.
///
/// Every layout page carries `<meta name="csrf-token" content="...">`.
#[must_use]
pub fn extract_csrf(html: &str) -> Option<String> {
    let marker = r#"name="csrf-token" content=""#;
    let start = html.find(marker)? + marker.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(str::to_owned)
}

/// Ids of the invoice links on the order history page, newest first.
#[must_use]
pub fn extract_order_ids(html: &str) -> Vec<i32> {
    html.split(r#"href="/orders/"#)
        .skip(1)
        .filter_map(|chunk| chunk.split('"').next()?.parse().ok())
        .collect()
}

/// A cookie-keeping client logged in (or not) to the storefront.
pub struct TestClient {
    pub client: Client,
    pub base_url: String,
}

impl TestClient {
    /// A fresh client with its own cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        // The auth routes are rate limited per client IP; a distinct
        // forwarded address keeps each test in its own bucket.
        let id = uuid::Uuid::new_v4();
        let [a, b, c, ..] = *id.as_bytes();
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            reqwest::header::HeaderValue::from_str(&format!("10.{a}.{b}.{c}"))
                .expect("valid header"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: storefront_base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a page and return its body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn page(&self, path: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed");
        let status = resp.status();
        (status, resp.text().await.expect("body"))
    }

    /// The session's anti-forgery token, read from `path`.
    ///
    /// # Panics
    ///
    /// Panics if the page carries no token.
    pub async fn csrf(&self, path: &str) -> String {
        let (_, html) = self.page(path).await;
        extract_csrf(&html).expect("page has no csrf token")
    }

    /// POST a form, adding the session's `_csrf` field.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> reqwest::Response {
        let token = self.csrf("/").await;
        let mut form: Vec<(&str, &str)> = fields.to_vec();
        form.push(("_csrf", &token));
        self.client
            .post(self.url(path))
            .form(&form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Create an account with a unique email and log in.
    ///
    /// Returns the email used.
    ///
    /// # Panics
    ///
    /// Panics if signup or login does not succeed.
    pub async fn signup_and_login(&self) -> String {
        let email = format!("it-{}@bazaar.test", uuid::Uuid::new_v4());

        let resp = self
            .post_form(
                "/signup",
                &[
                    ("email", &email),
                    ("password", TEST_PASSWORD),
                    ("confirmPassword", TEST_PASSWORD),
                ],
            )
            .await;
        assert!(resp.status().is_success(), "signup: {}", resp.status());

        let resp = self
            .post_form("/login", &[("email", &email), ("password", TEST_PASSWORD)])
            .await;
        assert!(resp.status().is_success(), "login: {}", resp.status());

        let (_, home) = self.page("/").await;
        assert!(home.contains(&email), "not logged in after login");
        email
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert a product directly into the database.
///
/// # Panics
///
/// Panics if `STOREFRONT_DATABASE_URL` is unset or the insert fails.
pub async fn create_product(title: &str, price: Decimal) -> ProductId {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("STOREFRONT_DATABASE_URL not set");
    let pool = create_pool(&url).await.expect("database connection");
    let product = ProductRepository::new(pool)
        .insert(title, price, &format!("{title} for integration tests"), "")
        .await
        .expect("insert product");
    product.id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf() {
        let html = r#"<head><meta name="csrf-token" content="abc_123-XYZ"></head>"#;
        assert_eq!(extract_csrf(html).as_deref(), Some("abc_123-XYZ"));
        assert_eq!(extract_csrf("<head></head>"), None);
    }

    #[test]
    fn test_extract_order_ids() {
        let html = r#"<a href="/orders/12">Invoice</a> <a href="/orders">x</a> <a href="/orders/7">Invoice</a>"#;
        assert_eq!(extract_order_ids(html), vec![12, 7]);
    }
}
