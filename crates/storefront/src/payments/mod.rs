//! Hosted payment sessions.
//!
//! The storefront never touches card data. Checkout asks a
//! [`PaymentGateway`] for a hosted session and hands the session id to the
//! browser, which redirects to the processor's payment page.
//!
//! [`StripeClient`] is the production gateway, speaking the Stripe Checkout
//! REST API.

mod stripe;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use stripe::{StripeClient, encode_checkout_form};

/// Errors from the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The processor answered with a non-success status.
    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A price cannot be expressed in minor units.
    #[error("price out of range for {0}")]
    InvalidAmount(String),
}

/// One priced line of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    /// Unit price in the currency's minor unit (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Everything the processor needs to open a hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    /// Lowercase ISO currency code, e.g. `usd`.
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Handle to a hosted payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page, when the processor returns one.
    pub url: Option<String>,
}

pub type DynPaymentGateway = Arc<dyn PaymentGateway + Send + Sync>;

/// A hosted checkout provider.
#[async_trait]
pub trait PaymentGateway {
    /// Open a hosted payment session. Single attempt, no retry.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

#[cfg(test)]
pub mod fake {
    //! Recording gateway for tests.

    use tokio::sync::Mutex;

    use super::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway};

    /// Records every request and returns a fixed session, or fails on demand.
    #[derive(Default)]
    pub struct FakeGateway {
        pub requests: Mutex<Vec<CheckoutSessionRequest>>,
        pub fail: bool,
    }

    impl FakeGateway {
        #[must_use]
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub async fn request_count(&self) -> usize {
            self.requests.lock().await.len()
        }
    }

    #[async_trait::async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_checkout_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            let mut requests = self.requests.lock().await;
            requests.push(request.clone());
            if self.fail {
                return Err(PaymentError::Api {
                    status: 402,
                    message: "card declined".to_owned(),
                });
            }
            Ok(CheckoutSession {
                id: format!("cs_test_{}", requests.len()),
                url: Some(format!("https://checkout.test/pay/{}", requests.len())),
            })
        }
    }
}
