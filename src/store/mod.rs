//! Persistence ports and their adapters.
//!
//! Services only see the traits below. `postgres` is the production adapter;
//! `memory` backs the tests and local runs without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::query::{OrderSortField, Page, PageRequest, ProductSortField, Sort};
use crate::domain::stats::{MonthlySales, StatusCount};
use crate::domain::{Cart, Email, Order, OrderId, Product, ProductId, User, UserId};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint or an expected revision did not hold.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("query failed: {0}")]
    Query(String),
    /// A stored record could not be mapped back into the domain.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> StoreResult<()>;
    async fn update(&self, user: &User) -> StoreResult<()>;
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>>;
    async fn list(&self) -> StoreResult<Vec<User>>;
    /// Removes the user together with their sessions and cart.
    async fn delete(&self, id: UserId) -> StoreResult<bool>;
    async fn count(&self) -> StoreResult<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> StoreResult<()>;
    async fn update(&self, product: &Product) -> StoreResult<()>;
    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn find_many(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
    async fn list_active(&self, page: PageRequest, sort: Sort<ProductSortField>) -> StoreResult<Page<Product>>;
    async fn delete(&self, id: ProductId) -> StoreResult<bool>;
    async fn count(&self) -> StoreResult<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(&self, user_id: UserId) -> StoreResult<Option<Cart>>;
    /// Create-or-replace. With `expected_revision`, the write only lands if
    /// the stored revision (0 when absent) still matches.
    async fn upsert(&self, cart: &Cart, expected_revision: Option<u64>) -> StoreResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> StoreResult<()>;
    async fn update(&self, order: &Order) -> StoreResult<()>;
    async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Orders of one user, or of everyone when `user_id` is `None`.
    async fn list(&self, user_id: Option<UserId>, page: PageRequest, sort: Sort<OrderSortField>) -> StoreResult<Page<Order>>;
    async fn latest_for_user(&self, user_id: UserId) -> StoreResult<Option<Order>>;
    async fn delete(&self, id: OrderId) -> StoreResult<bool>;
    async fn count(&self) -> StoreResult<u64>;
    async fn paid_revenue(&self) -> StoreResult<Decimal>;
    async fn monthly_paid_sales(&self, since: DateTime<Utc>) -> StoreResult<Vec<MonthlySales>>;
    async fn status_breakdown(&self) -> StoreResult<Vec<StatusCount>>;
}

/// Stored bearer session. Only the keyed hash of the token is kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token_hash: String,
    pub user_id: UserId,
    pub impersonator: Option<UserId>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> StoreResult<()>;
    async fn find(&self, token_hash: &str) -> StoreResult<Option<Session>>;
    async fn delete(&self, token_hash: &str) -> StoreResult<()>;
}

/// The set of ports a request handler can reach.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Stores {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_adapter(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_adapter(Arc::new(MemoryStore::default()))
    }

    fn from_adapter<A>(adapter: Arc<A>) -> Self
    where
        A: UserRepository + ProductRepository + CartRepository + OrderRepository + SessionRepository + 'static,
    {
        Self {
            users: adapter.clone(),
            products: adapter.clone(),
            carts: adapter.clone(),
            orders: adapter.clone(),
            sessions: adapter,
        }
    }
}
