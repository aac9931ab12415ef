//! Catalog reads: paginated listings and product detail.

use tracing::instrument;

use bazaar_core::{PageRequest, Pagination, ProductId};

use super::ShopError;
use crate::db::DynProductStore;
use crate::models::Product;

/// One page of the catalog.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct CatalogService {
    products: DynProductStore,
    page_size: u32,
}

impl CatalogService {
    #[must_use]
    pub const fn new(products: DynProductStore, page_size: u32) -> Self {
        Self {
            products,
            page_size,
        }
    }

    /// Products on `page`, in ascending id order, with navigation metadata.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the store fails.
    #[instrument(skip(self), fields(page = page.get()))]
    pub async fn list_products(&self, page: PageRequest) -> Result<ProductPage, ShopError> {
        let total = self.products.count().await?;
        let pagination = Pagination::new(page, self.page_size, total);

        let products = if pagination.expected_len() == 0 {
            Vec::new()
        } else {
            self.products
                .list(pagination.offset(), pagination.limit())
                .await?
        };

        Ok(ProductPage {
            products,
            pagination,
        })
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ProductNotFound` if no product has this id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ShopError> {
        self.products
            .get(id)
            .await?
            .ok_or(ShopError::ProductNotFound(id))
    }
}
