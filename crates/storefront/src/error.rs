//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! logged and captured to Sentry before a generic error page is rendered;
//! internal details never reach the client.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, ShopError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog, cart, checkout, order or invoice operation failed.
    #[error(transparent)]
    Shop(#[from] ShopError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Reading or writing the session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated, but not allowed to see this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or mismatched anti-forgery token.
    #[error("Invalid CSRF token")]
    Csrf,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Generic error page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Shop(err) => match err {
                ShopError::ProductNotFound(_) | ShopError::OrderNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ShopError::NotOrderOwner { .. } => StatusCode::FORBIDDEN,
                ShopError::UserNotFound(_) => StatusCode::UNAUTHORIZED,
                ShopError::EmptyCart => StatusCode::BAD_REQUEST,
                ShopError::Payment(_) => StatusCode::BAD_GATEWAY,
                ShopError::Repository(_) | ShopError::Invoice(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) | Self::Csrf => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show to the client.
    fn public_message(&self, status: StatusCode) -> String {
        match self {
            Self::Auth(err) => err.user_message(),
            Self::Csrf => "Your session expired. Please reload the page and try again.".to_owned(),
            Self::Shop(ShopError::Payment(_)) => {
                "The payment provider is unavailable. Please try again shortly.".to_owned()
            }
            Self::NotFound(_)
            | Self::Shop(ShopError::ProductNotFound(_) | ShopError::OrderNotFound(_)) => {
                "We couldn't find what you were looking for.".to_owned()
            }
            Self::Forbidden(_) | Self::Shop(ShopError::NotOrderOwner { .. }) => {
                "You don't have access to this page.".to_owned()
            }
            Self::BadRequest(msg) => msg.clone(),
            _ if status.is_server_error() => "Something went wrong on our end.".to_owned(),
            _ => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let page = ErrorTemplate {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_owned(),
            message: self.public_message(status),
        };

        (status, page).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use bazaar_core::{OrderId, ProductId, UserId};

    use super::*;
    use crate::payments::PaymentError;
    use crate::services::InvoiceError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::Shop(ShopError::ProductNotFound(ProductId::new(7)));
        assert_eq!(err.to_string(), "product 7 not found");
    }

    #[test]
    fn test_shop_error_status_codes() {
        assert_eq!(
            get_status(ShopError::ProductNotFound(ProductId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ShopError::OrderNotFound(OrderId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                ShopError::NotOrderOwner {
                    order: OrderId::new(1),
                    user: UserId::new(2),
                }
                .into()
            ),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(
                ShopError::Payment(PaymentError::Api {
                    status: 500,
                    message: "boom".to_owned(),
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(ShopError::Invoice(InvoiceError::Pdf("bad".to_owned())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::Csrf), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("secret".to_owned()));
        let message = err.public_message(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("secret"));
    }
}
