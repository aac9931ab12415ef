//! Admin product management.
//!
//! The product list renders one `<article>` per product with a delete
//! button; `static/js/admin.js` calls [`delete_product`] and removes the
//! article when the server confirms.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use super::{PageContext, ProductView};
use crate::db::ProductStore;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CSRF_HEADER, RequireAuth, verify_csrf};
use crate::state::AppState;

/// Admin product list.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
}

/// Body of every delete response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

const DELETE_OK: &str = "Success!";
const DELETE_FAILED: &str = "Deleting product failed.";

fn delete_response(status: StatusCode, message: &'static str) -> Response {
    (status, Json(DeleteResponse { message })).into_response()
}

/// List every product with a delete button.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<AdminProductsTemplate> {
    let total = state.products().count().await?;
    let products = state.products().list(0, total).await?;
    let currency = state.config().stripe.currency;

    Ok(AdminProductsTemplate {
        page,
        products: products
            .iter()
            .map(|p| ProductView::new(p, currency))
            .collect(),
    })
}

/// Delete a product. Carts lose the product; placed orders keep their copy.
#[instrument(skip(state, session, headers, user), fields(user_id = %user.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if verify_csrf(&session, token).await.is_err() {
        return delete_response(StatusCode::FORBIDDEN, DELETE_FAILED);
    }

    let Ok(id) = product_id.parse::<ProductId>() else {
        return delete_response(StatusCode::NOT_FOUND, DELETE_FAILED);
    };

    match state.products().delete(id).await {
        Ok(true) => {
            tracing::info!(product_id = %id, "Product deleted");
            delete_response(StatusCode::OK, DELETE_OK)
        }
        Ok(false) => delete_response(StatusCode::NOT_FOUND, DELETE_FAILED),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Deleting product failed");
            delete_response(StatusCode::INTERNAL_SERVER_ERROR, DELETE_FAILED)
        }
    }
}
