//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` via tower-sessions. The session holds the
//! logged-in user and the anti-forgery token. The cookie carrying the
//! session id is signed with `STOREFRONT_SESSION_SECRET`; a cookie with a
//! bad signature is treated as no session.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::{ConfigError, StorefrontConfig};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session layer type used by the router.
pub type SessionLayer<S> = SessionManagerLayer<S, SignedCookie>;

/// Signing key for the session cookie.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the secret is shorter than a
/// signing key.
pub fn session_key(config: &StorefrontConfig) -> Result<Key, ConfigError> {
    Key::try_from(config.session_secret.expose_secret().as_bytes()).map_err(|e| {
        ConfigError::InsecureSecret("STOREFRONT_SESSION_SECRET".to_owned(), e.to_string())
    })
}

/// Create the session layer with the `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the migrations.
///
/// # Errors
///
/// Returns an error if the session secret cannot be used as a signing key.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionLayer<PostgresStore>, ConfigError> {
    configure(PostgresStore::new(pool.clone()), config)
}

/// Apply cookie settings and signing to any store.
///
/// # Errors
///
/// Returns an error if the session secret cannot be used as a signing key.
pub fn configure<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> Result<SessionLayer<S>, ConfigError> {
    let key = session_key(config)?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
