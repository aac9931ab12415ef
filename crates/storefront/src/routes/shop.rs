//! Catalog pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{PageRequest, Pagination, ProductId};

use super::{PageContext, ProductView, parse_path_id};
use crate::error::Result;
use crate::filters;
use crate::state::AppState;

/// Pagination query parameters.
///
/// Kept as a string so junk like `?page=abc` falls back to page 1 instead
/// of failing extraction.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<String>,
}

/// Product listing page, used for `/` and `/products`.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_list.html")]
pub struct ProductListTemplate {
    pub page: PageContext,
    pub title: &'static str,
    /// Path the pagination links point at.
    pub base_path: &'static str,
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

/// Product detail page.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_detail.html")]
pub struct ProductDetailTemplate {
    pub page: PageContext,
    pub product: ProductView,
}

async fn listing(
    state: &AppState,
    page: PageContext,
    query: &PaginationQuery,
    title: &'static str,
    base_path: &'static str,
) -> Result<ProductListTemplate> {
    let request = PageRequest::from_query(query.page.as_deref());
    let result = state.catalog().list_products(request).await?;
    let currency = state.config().stripe.currency;

    Ok(ProductListTemplate {
        page,
        title,
        base_path,
        products: result
            .products
            .iter()
            .map(|p| ProductView::new(p, currency))
            .collect(),
        pagination: result.pagination,
    })
}

/// Shop index.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<PaginationQuery>,
) -> Result<ProductListTemplate> {
    listing(&state, page, &query, "Shop", "/").await
}

/// Product listing.
#[instrument(skip(state, page))]
pub async fn products(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<PaginationQuery>,
) -> Result<ProductListTemplate> {
    listing(&state, page, &query, "All Products", "/products").await
}

/// Product detail.
#[instrument(skip(state, page))]
pub async fn product_detail(
    State(state): State<AppState>,
    page: PageContext,
    Path(product_id): Path<String>,
) -> Result<ProductDetailTemplate> {
    let id: ProductId = parse_path_id(&product_id, "product")?;
    let product = state.catalog().get_product(id).await?;

    Ok(ProductDetailTemplate {
        page,
        product: ProductView::new(&product, state.config().stripe.currency),
    })
}
