//! Stripe Checkout client.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway};
use crate::config::StripeConfig;

/// Client for `POST /v1/checkout/sessions`.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    endpoint: String,
    secret_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        let endpoint = format!(
            "{}/v1/checkout/sessions",
            config.api_base.trim_end_matches('/')
        );

        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                endpoint,
                secret_key: config.secret_key.clone(),
            }),
        }
    }
}

/// Form fields for a Checkout Session, in Stripe's bracketed notation.
#[must_use]
pub fn encode_checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("payment_method_types[0]".to_owned(), "card".to_owned()),
        ("mode".to_owned(), "payment".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let key = |field: &str| format!("line_items[{i}]{field}");
        form.push((key("[quantity]"), item.quantity.to_string()));
        form.push((key("[price_data][currency]"), request.currency.clone()));
        form.push((key("[price_data][unit_amount]"), item.unit_amount.to_string()));
        form.push((key("[price_data][product_data][name]"), item.name.clone()));
        // Stripe rejects empty strings for optional fields.
        if !item.description.is_empty() {
            form.push((
                key("[price_data][product_data][description]"),
                item.description.clone(),
            ));
        }
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&encode_checkout_form(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            tracing::error!(
                status = %status,
                message = %message,
                "Stripe rejected checkout session"
            );
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Stripe checkout session"
            );
            PaymentError::Parse(e)
        })?;

        tracing::debug!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}
