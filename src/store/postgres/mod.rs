//! Postgres adapter built on sqlx.
//!
//! Cart items, order lines and shipping addresses are stored as JSONB
//! documents; everything else is plain columns. Schema lives in
//! `migrations/`.

mod rows;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use self::rows::{to_i64, CartRow, OrderRow, ProductRow, SessionRow, UserRow};
use super::{
    CartRepository, OrderRepository, ProductRepository, Session, SessionRepository, StoreError, StoreResult,
    UserRepository,
};
use crate::domain::query::{OrderSortField, Page, PageRequest, ProductSortField, Sort};
use crate::domain::stats::{MonthlySales, StatusCount};
use crate::domain::{Cart, Email, Order, OrderId, Product, ProductId, User, UserId};

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn count(row: (i64,)) -> u64 { u64::try_from(row.0).unwrap_or(0) }

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email, password_hash, role, is_blocked, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id.as_uuid()).bind(&user.first_name).bind(&user.last_name).bind(user.email.as_str())
        .bind(&user.password_hash).bind(user.role.as_str()).bind(user.is_blocked).bind(user.created_at).bind(user.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4, password_hash = $5, role = $6, \
             is_blocked = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(user.id.as_uuid()).bind(&user.first_name).bind(&user.last_name).bind(user.email.as_str())
        .bind(&user.password_hash).bind(user.role.as_str()).bind(user.is_blocked).bind(user.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid()).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email.as_str()).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at, id")
            .fetch_all(&self.pool).await?
            .into_iter().map(User::try_from).collect()
    }

    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        // sessions and carts cascade
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(count(sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?))
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, category, stock, image, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(p.id.as_uuid()).bind(&p.name).bind(&p.description).bind(p.price.amount()).bind(&p.category)
        .bind(i64::from(p.stock)).bind(&p.image).bind(p.is_active).bind(p.created_at).bind(p.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(
            "UPDATE products SET name = $2, description = $3, price = $4, category = $5, stock = $6, image = $7, \
             is_active = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(p.id.as_uuid()).bind(&p.name).bind(&p.description).bind(p.price.amount()).bind(&p.category)
        .bind(i64::from(p.stock)).bind(&p.image).bind(p.is_active).bind(p.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid()).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn find_many(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let ids: Vec<uuid::Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids).fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    async fn list_active(&self, page: PageRequest, sort: Sort<ProductSortField>) -> StoreResult<Page<Product>> {
        // column and direction come from closed enums, never from the request
        let sql = format!(
            "SELECT * FROM products WHERE is_active ORDER BY {col} {dir}, id {dir} LIMIT $1 OFFSET $2",
            col = sort.field.column(),
            dir = sort.direction.as_sql(),
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(i64::from(page.per_page())).bind(to_i64(page.offset())?)
            .fetch_all(&self.pool).await?;
        let total = count(sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active").fetch_one(&self.pool).await?);
        let data = rows.into_iter().map(Product::try_from).collect::<StoreResult<Vec<_>>>()?;
        Ok(page.into_page(data, total))
    }

    async fn delete(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(count(sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?))
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid()).fetch_optional(&self.pool).await?
            .map(Cart::try_from).transpose()
    }

    async fn upsert(&self, cart: &Cart, expected_revision: Option<u64>) -> StoreResult<()> {
        // Each form is one statement, so the revision check and the write
        // can not interleave with another writer.
        let sql = match expected_revision {
            None => "INSERT INTO carts (user_id, items, revision, updated_at) VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, revision = EXCLUDED.revision, \
                     updated_at = EXCLUDED.updated_at",
            // an absent document counts as revision 0
            Some(0) => "INSERT INTO carts (user_id, items, revision, updated_at) VALUES ($1, $2, $3, $4) \
                        ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, revision = EXCLUDED.revision, \
                        updated_at = EXCLUDED.updated_at WHERE carts.revision = $5",
            Some(_) => "UPDATE carts SET items = $2, revision = $3, updated_at = $4 WHERE user_id = $1 AND revision = $5",
        };
        let stored = cart.without_snapshots();
        let mut query = sqlx::query(sql)
            .bind(cart.user_id().as_uuid())
            .bind(Json(stored.items()))
            .bind(to_i64(cart.revision())?)
            .bind(cart.updated_at());
        if let Some(expected) = expected_revision {
            query = query.bind(to_i64(expected)?);
        }
        if query.execute(&self.pool).await?.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "cart of user {} is no longer at revision {}", cart.user_id(), expected_revision.unwrap_or(0)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, o: &Order) -> StoreResult<()> {
        let cart_revision = o.cart_revision().map(to_i64).transpose()?;
        sqlx::query(
            "INSERT INTO orders (id, user_id, items, total_amount, shipping_address, payment_method, status, \
             payment_status, cart_revision, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(o.id().as_uuid()).bind(o.user_id().as_uuid()).bind(Json(o.items())).bind(o.total_amount().amount())
        .bind(Json(o.shipping_address())).bind(o.payment_method().as_str()).bind(o.status().as_str())
        .bind(o.payment_status().as_str()).bind(cart_revision).bind(o.created_at()).bind(o.updated_at())
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, o: &Order) -> StoreResult<()> {
        // line items and totals are immutable; only the status columns move
        sqlx::query("UPDATE orders SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1")
            .bind(o.id().as_uuid()).bind(o.status().as_str()).bind(o.payment_status().as_str()).bind(o.updated_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid()).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn list(&self, user_id: Option<UserId>, page: PageRequest, sort: Sort<OrderSortField>) -> StoreResult<Page<Order>> {
        let owner = user_id.map(|u| u.as_uuid());
        let sql = format!(
            "SELECT * FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY {col} {dir}, id {dir} LIMIT $2 OFFSET $3",
            col = sort.field.column(),
            dir = sort.direction.as_sql(),
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(owner).bind(i64::from(page.per_page())).bind(to_i64(page.offset())?)
            .fetch_all(&self.pool).await?;
        let total = count(
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR user_id = $1)")
                .bind(owner).fetch_one(&self.pool).await?,
        );
        let data = rows.into_iter().map(Order::try_from).collect::<StoreResult<Vec<_>>>()?;
        Ok(page.into_page(data, total))
    }

    async fn latest_for_user(&self, user_id: UserId) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1")
            .bind(user_id.as_uuid()).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn delete(&self, id: OrderId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(count(sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&self.pool).await?))
    }

    async fn paid_revenue(&self) -> StoreResult<Decimal> {
        let (total,): (Decimal,) = sqlx::query_as("SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE payment_status = 'paid'")
            .fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn monthly_paid_sales(&self, since: DateTime<Utc>) -> StoreResult<Vec<MonthlySales>> {
        let rows: Vec<(i32, i32, Decimal, i64)> = sqlx::query_as(
            "SELECT EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::INT4 AS year, \
                    EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::INT4 AS month, \
                    SUM(total_amount) AS total, COUNT(*) AS count \
             FROM orders WHERE payment_status = 'paid' AND created_at >= $1 \
             GROUP BY 1, 2 ORDER BY 1, 2",
        )
        .bind(since).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|(year, month, total, n)| {
                let month = u32::try_from(month).map_err(|e| StoreError::Corrupt(format!("month {month}: {e}")))?;
                Ok(MonthlySales { year, month, total, count: u64::try_from(n).unwrap_or(0) })
            })
            .collect()
    }

    async fn status_breakdown(&self) -> StoreResult<Vec<StatusCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY status")
            .fetch_all(&self.pool).await?;
        let mut breakdown = rows.into_iter()
            .map(|(status, n)| {
                let status = status.parse().map_err(|e| StoreError::Corrupt(format!("order status {status}: {e}")))?;
                Ok(StatusCount { status, count: u64::try_from(n).unwrap_or(0) })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        breakdown.sort_by_key(|s| s.status);
        Ok(breakdown)
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn insert(&self, s: &Session) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, impersonator, expires_at, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(&s.token_hash).bind(s.user_id.as_uuid()).bind(s.impersonator.map(|u| u.as_uuid()))
            .bind(s.expires_at).bind(s.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash).fetch_optional(&self.pool).await?
            .map(Session::from))
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1").bind(token_hash).execute(&self.pool).await?;
        Ok(())
    }
}
