//! Anti-forgery tokens.
//!
//! Each session carries one random token. Forms send it back as `_csrf`,
//! scripts as the `csrf-token` header; state-changing handlers call
//! [`verify_csrf`] before doing anything.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;

/// Header used by `static/js/admin.js`.
pub const CSRF_HEADER: &str = "csrf-token";

/// The session's anti-forgery token, created on first use.
#[derive(Clone, Debug)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Generate a new random token (256-bit, base64url).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Load the session token, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn for_session(session: &Session) -> Result<Self, AppError> {
        if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
            return Ok(Self(token));
        }
        let token = Self::generate();
        session.insert(session_keys::CSRF_TOKEN, &token.0).await?;
        Ok(token)
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;
        Self::for_session(session).await
    }
}

fn tokens_match(expected: &[u8], submitted: &[u8]) -> bool {
    expected.len() == submitted.len()
        && expected
            .iter()
            .zip(submitted)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Check a submitted token against the session's.
///
/// # Errors
///
/// Returns `AppError::Csrf` when the session has no token or the tokens
/// differ.
pub async fn verify_csrf(session: &Session, submitted: &str) -> Result<(), AppError> {
    let expected = session
        .get::<String>(session_keys::CSRF_TOKEN)
        .await?
        .ok_or(AppError::Csrf)?;

    if tokens_match(expected.as_bytes(), submitted.as_bytes()) {
        Ok(())
    } else {
        tracing::warn!("CSRF token mismatch");
        Err(AppError::Csrf)
    }
}
