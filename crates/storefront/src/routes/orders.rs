//! Order placement, history and invoices.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CurrencyCode, OrderId};

use super::{PageContext, money, parse_path_id};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, verify_csrf};
use crate::models::Order;
use crate::state::AppState;

/// One order line for templates.
#[derive(Clone, Debug)]
pub struct OrderLineView {
    pub title: String,
    pub quantity: u32,
    pub unit_price: String,
}

/// One order for templates.
#[derive(Clone, Debug)]
pub struct OrderView {
    pub id: String,
    pub placed_at: String,
    pub lines: Vec<OrderLineView>,
    pub total: String,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            placed_at: order.created_at.format("%B %-d, %Y").to_string(),
            lines: order
                .lines
                .iter()
                .map(|line| OrderLineView {
                    title: line.product.title.clone(),
                    quantity: line.quantity,
                    unit_price: money(line.product.price, currency),
                })
                .collect(),
            total: money(order.total(), currency),
        }
    }
}

/// Order history page.
#[derive(Template, WebTemplate)]
#[template(path = "shop/orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
}

/// "Order Now" form.
#[derive(Debug, Deserialize)]
pub struct CreateOrderForm {
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Place an order from the cart.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CreateOrderForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf).await?;
    state.orders().finalize_order(user.id).await?;
    Ok(Redirect::to("/orders"))
}

/// The user's orders, newest first.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<OrdersTemplate> {
    let currency = state.config().stripe.currency;
    let orders = state.orders().list_orders(user.id).await?;

    Ok(OrdersTemplate {
        page,
        orders: orders.iter().map(|o| OrderView::new(o, currency)).collect(),
    })
}

/// Stream the invoice PDF for one of the user's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<String>,
) -> Result<Response> {
    let order_id: OrderId = parse_path_id(&order_id, "order")?;
    let invoice = state.invoices().render_invoice(order_id, user.id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", invoice.file_name),
            ),
        ],
        invoice.bytes,
    )
        .into_response())
}
