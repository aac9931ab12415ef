//! Checkout: turn the cart into a hosted payment session.

use rust_decimal::Decimal;
use tracing::instrument;

use bazaar_core::{CurrencyCode, UserId};

use super::ShopError;
use super::cart::{CartService, ResolvedCart};
use crate::payments::{
    CheckoutSession, CheckoutSessionRequest, DynPaymentGateway, LineItem, PaymentError,
};

/// Path the processor redirects to after payment.
pub const SUCCESS_PATH: &str = "/checkout/success";
/// Path the processor redirects to when the buyer backs out.
pub const CANCEL_PATH: &str = "/checkout/cancel";

/// What the confirmation page shows.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub cart: ResolvedCart,
    pub total: Decimal,
    pub session: CheckoutSession,
}

#[derive(Clone)]
pub struct CheckoutService {
    cart: CartService,
    gateway: DynPaymentGateway,
    currency: CurrencyCode,
}

impl CheckoutService {
    #[must_use]
    pub const fn new(
        cart: CartService,
        gateway: DynPaymentGateway,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            cart,
            gateway,
            currency,
        }
    }

    /// Open a payment session for the user's cart.
    ///
    /// `origin` is the scheme and host the buyer reached us on, without a
    /// trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::EmptyCart` without contacting the processor when
    /// there is nothing to pay for, and `ShopError::Payment` if the processor
    /// call fails.
    #[instrument(skip(self))]
    pub async fn prepare_checkout(
        &self,
        user_id: UserId,
        origin: &str,
    ) -> Result<CheckoutSummary, ShopError> {
        let cart = self.cart.get_cart(user_id).await?;
        if cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let request = self.session_request(&cart, origin)?;
        let session = self.gateway.create_checkout_session(&request).await?;

        tracing::info!(session_id = %session.id, "Checkout session opened");
        Ok(CheckoutSummary {
            total: cart.total(),
            cart,
            session,
        })
    }

    fn session_request(
        &self,
        cart: &ResolvedCart,
        origin: &str,
    ) -> Result<CheckoutSessionRequest, PaymentError> {
        let line_items = cart
            .lines
            .iter()
            .map(|line| {
                let price = line.product.price_in(self.currency);
                let unit_amount = price
                    .minor_units()
                    .ok_or_else(|| PaymentError::InvalidAmount(line.product.title.clone()))?;
                Ok(LineItem {
                    name: line.product.title.clone(),
                    description: line.product.description.clone(),
                    unit_amount,
                    quantity: line.quantity,
                })
            })
            .collect::<Result<Vec<_>, PaymentError>>()?;

        Ok(CheckoutSessionRequest {
            line_items,
            currency: self.currency.as_lower().to_owned(),
            success_url: format!("{origin}{SUCCESS_PATH}"),
            cancel_url: format!("{origin}{CANCEL_PATH}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::payments::fake::FakeGateway;

    async fn setup(gateway: Arc<FakeGateway>) -> (MemoryStore, CheckoutService, UserId) {
        let store = MemoryStore::new();
        let user = store.insert_user("buyer@example.com").await;
        let cart = CartService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let checkout = CheckoutService::new(cart, gateway, CurrencyCode::USD);
        (store, checkout, user.id)
    }

    #[tokio::test]
    async fn test_session_has_one_line_per_entry() {
        let gateway = Arc::new(FakeGateway::default());
        let (store, checkout, user) = setup(Arc::clone(&gateway)).await;
        let x = store.insert_product("X", Decimal::from(10)).await;
        let y = store.insert_product("Y", Decimal::new(499, 2)).await;
        checkout.cart.add_to_cart(user, x.id).await.expect("add");
        checkout.cart.add_to_cart(user, x.id).await.expect("add");
        checkout.cart.add_to_cart(user, y.id).await.expect("add");

        let summary = checkout
            .prepare_checkout(user, "https://shop.example")
            .await
            .expect("checkout");
        assert_eq!(summary.total, Decimal::new(2499, 2));
        assert_eq!(summary.session.id, "cs_test_1");

        let requests = gateway.requests.lock().await;
        let request = requests.first().expect("one request");
        assert_eq!(request.currency, "usd");
        assert_eq!(request.success_url, "https://shop.example/checkout/success");
        assert_eq!(request.cancel_url, "https://shop.example/checkout/cancel");
        let amounts: Vec<_> = request
            .line_items
            .iter()
            .map(|l| (l.name.as_str(), l.unit_amount, l.quantity))
            .collect();
        assert_eq!(amounts, [("X", 1000, 2), ("Y", 499, 1)]);
    }

    #[tokio::test]
    async fn test_empty_cart_skips_processor() {
        let gateway = Arc::new(FakeGateway::default());
        let (_, checkout, user) = setup(Arc::clone(&gateway)).await;

        let err = checkout
            .prepare_checkout(user, "http://localhost:3000")
            .await
            .expect_err("empty");
        assert!(matches!(err, ShopError::EmptyCart));
        assert_eq!(gateway.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_processor_failure_surfaces() {
        let gateway = Arc::new(FakeGateway::failing());
        let (store, checkout, user) = setup(Arc::clone(&gateway)).await;
        let x = store.insert_product("X", Decimal::from(10)).await;
        checkout.cart.add_to_cart(user, x.id).await.expect("add");

        let err = checkout
            .prepare_checkout(user, "http://localhost:3000")
            .await
            .expect_err("declined");
        assert!(matches!(err, ShopError::Payment(PaymentError::Api { status: 402, .. })));
        assert_eq!(store.cart_of(user).await.quantity_of(x.id), 1);
    }
}
