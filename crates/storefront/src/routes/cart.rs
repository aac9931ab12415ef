//! Cart route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CurrencyCode, ProductId};

use super::{PageContext, ProductView, money};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, verify_csrf};
use crate::services::ResolvedCart;
use crate::state::AppState;

/// One cart row for templates.
#[derive(Clone, Debug)]
pub struct CartItemView {
    pub product: ProductView,
    pub quantity: u32,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone, Debug)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &ResolvedCart, currency: CurrencyCode) -> Self {
        Self {
            items: cart
                .lines
                .iter()
                .map(|line| CartItemView {
                    product: ProductView::new(&line.product, currency),
                    quantity: line.quantity,
                    line_total: money(line.line_total(), currency),
                })
                .collect(),
            total: money(cart.total(), currency),
            item_count: cart.item_count(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Form posted by "Add to Cart" and "Delete" buttons.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

impl CartItemForm {
    fn product_id(&self) -> Result<ProductId> {
        self.product_id
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid product.".to_owned()))
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/cart.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Display the cart.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<CartTemplate> {
    let cart = state.cart().get_cart(user.id).await?;

    Ok(CartTemplate {
        page,
        cart: CartView::new(&cart, state.config().stripe.currency),
    })
}

/// Add one unit of a product, then show the cart.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CartItemForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf).await?;
    state.cart().add_to_cart(user.id, form.product_id()?).await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a product's entry, then show the cart.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CartItemForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf).await?;
    state
        .cart()
        .remove_from_cart(user.id, form.product_id()?)
        .await?;
    Ok(Redirect::to("/cart"))
}
