//! Checkout route handlers.
//!
//! `/checkout` opens a hosted payment session and renders a confirmation
//! page linking to it. The processor sends the buyer back to
//! `/checkout/success` (order placed) or `/checkout/cancel`, which only
//! redirects to `/checkout`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use super::cart::CartView;
use super::{PageContext, money, request_origin};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::ShopError;
use crate::state::AppState;

/// Checkout confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "shop/checkout.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub total: String,
    pub session_id: String,
    /// Hosted payment page.
    pub payment_url: Option<String>,
    pub publishable_key: String,
}

/// Open a payment session for the cart and show the confirmation page.
///
/// An empty cart goes back to `/cart` without contacting the processor.
#[instrument(skip(state, headers, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    page: PageContext,
) -> Result<Response> {
    let origin = request_origin(&headers, &state.config().base_url);

    let summary = match state.checkout().prepare_checkout(user.id, &origin).await {
        Ok(summary) => summary,
        Err(ShopError::EmptyCart) => return Ok(Redirect::to("/cart").into_response()),
        Err(e) => return Err(AppError::from(e)),
    };

    let currency = state.config().stripe.currency;
    Ok(CheckoutTemplate {
        page,
        cart: CartView::new(&summary.cart, currency),
        total: money(summary.total, currency),
        session_id: summary.session.id,
        payment_url: summary.session.url,
        publishable_key: state.config().stripe.publishable_key.clone(),
    }
    .into_response())
}

/// Payment completed: turn the cart into an order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    let order = state.orders().finalize_order(user.id).await?;
    tracing::info!(order_id = %order.id, "Order placed after payment");
    Ok(Redirect::to("/orders"))
}

/// Payment abandoned: back to the checkout page.
///
/// The abandoned session simply expires; `/checkout` opens a fresh one.
#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn cancel(RequireAuth(user): RequireAuth) -> Redirect {
    tracing::info!("Checkout cancelled");
    Redirect::to("/checkout")
}
