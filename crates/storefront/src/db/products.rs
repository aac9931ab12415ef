//! Product repository.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::ProductId;

use super::{ProductStore, RepositoryError};
use crate::models::Product;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    price: Decimal,
    description: String,
    image_url: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            title: row.title,
            price: row.price,
            description: row.description,
            image_url: row.image_url,
        }
    }
}

/// `PostgreSQL` catalog access.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product. Used by the seeder.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        title: &str,
        price: Decimal,
        description: &str,
        image_url: &str,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(
            r"
            INSERT INTO storefront.product (title, price, description, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, price, description, image_url
            ",
        )
        .bind(title)
        .bind(price)
        .bind(description)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product")
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {count}")))
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, title, price, description, image_url
            FROM storefront.product
            ORDER BY id
            OFFSET $1
            LIMIT $2
            ",
        )
        .bind(to_i64(offset))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r"
            SELECT id, title, price, description, image_url
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, title, price, description, image_url
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        // cart_item rows go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
