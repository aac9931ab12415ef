//! Order repository.
//!
//! Order lines carry copies of the product fields. `order_line.product_id`
//! has no foreign key, so deleting or repricing a product leaves placed
//! orders untouched.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{Email, OrderId, OrderLine, ProductId, ProductSnapshot, UserId};

use super::{OrderStore, RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{NewOrder, Order, OrderUser};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    user_email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: i32,
    quantity: i32,
    product_id: i32,
    title: String,
    price: Decimal,
    description: String,
    image_url: String,
}

impl OrderLineRow {
    fn into_line(self) -> Result<OrderLine, RepositoryError> {
        Ok(OrderLine {
            quantity: quantity_from_db(self.quantity)?,
            product: ProductSnapshot {
                product_id: ProductId::new(self.product_id),
                title: self.title,
                price: self.price,
                description: self.description,
                image_url: self.image_url,
            },
        })
    }
}

fn assemble(row: OrderRow, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
    let email = Email::parse(&row.user_email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email on order: {e}")))?;

    Ok(Order {
        id: OrderId::new(row.id),
        user: OrderUser {
            user_id: UserId::new(row.user_id),
            email,
        },
        lines,
        created_at: row.created_at,
    })
}

/// `PostgreSQL` order storage.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(
            r#"
            INSERT INTO storefront."order" (user_id, user_email)
            VALUES ($1, $2)
            RETURNING id, user_id, user_email, created_at
            "#,
        )
        .bind(order.user.user_id.as_i32())
        .bind(order.user.email.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for (position, line) in (0_i32..).zip(&order.lines) {
            sqlx::query(
                r"
                INSERT INTO storefront.order_line
                    (order_id, position, quantity, product_id, title, price, description, image_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(quantity_to_db(line.quantity)?)
            .bind(line.product.product_id.as_i32())
            .bind(&line.product.title)
            .bind(line.product.price)
            .bind(&line.product.description)
            .bind(&line.product.image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        assemble(row, order.lines.clone())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, user_email, created_at
            FROM storefront."order"
            WHERE id = $1
            "#,
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<OrderLineRow> = sqlx::query_as(
            r"
            SELECT order_id, quantity, product_id, title, price, description, image_url
            FROM storefront.order_line
            WHERE order_id = $1
            ORDER BY position
            ",
        )
        .bind(id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        let lines = lines
            .into_iter()
            .map(OrderLineRow::into_line)
            .collect::<Result<Vec<_>, _>>()?;

        assemble(row, lines).map(Some)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, user_email, created_at
            FROM storefront."order"
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let line_rows: Vec<OrderLineRow> = sqlx::query_as(
            r"
            SELECT order_id, quantity, product_id, title, price, description, image_url
            FROM storefront.order_line
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for line in line_rows {
            let order_id = line.order_id;
            lines_by_order
                .entry(order_id)
                .or_default()
                .push(line.into_line()?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = lines_by_order.remove(&row.id).unwrap_or_default();
                assemble(row, lines)
            })
            .collect()
    }
}
