//! User repository for database operations.
//!
//! Users are loaded together with their cart. The cart lives in
//! `storefront.cart_item` and is always written back as a whole.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use bazaar_core::{Cart, CartEntry, Email, ProductId, UserId};

use super::{
    RepositoryError, UserStore, conflict_or_database, quantity_from_db, quantity_to_db,
};
use crate::models::User;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    id: i32,
    email: String,
    created_at: DateTime<Utc>,
    password_hash: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    product_id: i32,
    quantity: i32,
}

fn parse_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

/// Load a user's cart in insertion order.
async fn load_cart(conn: &mut PgConnection, user_id: UserId) -> Result<Cart, RepositoryError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        r"
        SELECT product_id, quantity
        FROM storefront.cart_item
        WHERE user_id = $1
        ORDER BY position
        ",
    )
    .bind(user_id.as_i32())
    .fetch_all(conn)
    .await?;

    let entries = rows
        .into_iter()
        .map(|r| {
            Ok(CartEntry {
                product_id: ProductId::new(r.product_id),
                quantity: quantity_from_db(r.quantity)?,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Ok(Cart::from_entries(entries))
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, created_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let cart = load_cart(&mut conn, id).await?;

        Ok(Some(User {
            id: UserId::new(r.id),
            email: parse_email(&r.email)?,
            cart,
            created_at: r.created_at,
        }))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<UserWithPasswordRow> = sqlx::query_as(
            r"
            SELECT u.id, u.email, u.created_at, p.password_hash
            FROM storefront.user u
            LEFT JOIN storefront.user_password p ON u.id = p.user_id
            WHERE u.email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let Some(password_hash) = r.password_hash else {
            return Ok(None);
        };

        let id = UserId::new(r.id);
        let cart = load_cart(&mut conn, id).await?;

        let user = User {
            id,
            email: parse_email(&r.email)?,
            cart,
            created_at: r.created_at,
        };

        Ok(Some((user, password_hash)))
    }

    async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO storefront.user (email)
            VALUES ($1)
            RETURNING id, email, created_at
            ",
        )
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "email"))?;

        sqlx::query(
            r"
            INSERT INTO storefront.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(row.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(User {
            id: UserId::new(row.id),
            email: parse_email(&row.email)?,
            cart: Cart::new(),
            created_at: row.created_at,
        })
    }

    async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(&mut *tx)
            .await?;

        // A missing user would otherwise look like a successful save of an empty cart.
        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM storefront.user WHERE id = $1)")
                    .bind(user_id.as_i32())
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(RepositoryError::NotFound);
            }
        }

        for (position, entry) in (0_i32..).zip(cart.entries()) {
            sqlx::query(
                r"
                INSERT INTO storefront.cart_item (user_id, product_id, quantity, position)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(user_id.as_i32())
            .bind(entry.product_id.as_i32())
            .bind(quantity_to_db(entry.quantity)?)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
