//! In-memory adapter for every store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    CartRepository, OrderRepository, ProductRepository, Session, SessionRepository, StoreError, StoreResult,
    UserRepository,
};
use crate::domain::query::{OrderSortField, Page, PageRequest, ProductSortField, Sort, SortDirection};
use crate::domain::stats::{bucket_monthly, MonthlySales, StatusCount};
use crate::domain::{Cart, Email, Order, OrderId, OrderStatus, Product, ProductId, User, UserId};

#[derive(Default)]
struct Collections {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    sessions: HashMap<String, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

fn paginate<T>(mut rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as u64;
    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX).min(rows.len());
    let end = start.saturating_add(page.per_page() as usize).min(rows.len());
    let data = rows.drain(start..end).collect();
    page.into_page(data, total)
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction { SortDirection::Asc => ordering, SortDirection::Desc => ordering.reverse() }
}

fn email_taken(users: &HashMap<UserId, User>, user: &User) -> bool {
    users.values().any(|u| u.id != user.id && u.email == user.email)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if email_taken(&db.users, user) { return Err(StoreError::Conflict(format!("email {} already registered", user.email))); }
        db.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if email_taken(&db.users, user) { return Err(StoreError::Conflict(format!("email {} already registered", user.email))); }
        match db.users.get_mut(&user.id) {
            Some(existing) => { *existing = user.clone(); Ok(()) }
            None => Err(StoreError::Query(format!("user {} vanished during update", user.id))),
        }
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.values().find(|u| &u.email == email).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        let removed = db.users.remove(&id).is_some();
        if removed {
            db.sessions.retain(|_, s| s.user_id != id);
            db.carts.remove(&id);
        }
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().await.users.len() as u64)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        self.inner.write().await.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        match db.products.get_mut(&product.id) {
            Some(existing) => { *existing = product.clone(); Ok(()) }
            None => Err(StoreError::Query(format!("product {} vanished during update", product.id))),
        }
    }

    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let db = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| db.products.get(id).cloned()).collect())
    }

    async fn list_active(&self, page: PageRequest, sort: Sort<ProductSortField>) -> StoreResult<Page<Product>> {
        let mut rows: Vec<Product> = self.inner.read().await.products.values().filter(|p| p.is_active).cloned().collect();
        rows.sort_by(|a, b| {
            let ordering = match sort.field {
                ProductSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                ProductSortField::Price => a.price.cmp(&b.price),
                ProductSortField::Name => a.name.cmp(&b.name),
                ProductSortField::Stock => a.stock.cmp(&b.stock),
            };
            directed(ordering.then(a.id.cmp(&b.id)), sort.direction)
        });
        Ok(paginate(rows, page))
    }

    async fn delete(&self, id: ProductId) -> StoreResult<bool> {
        Ok(self.inner.write().await.products.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().await.products.len() as u64)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        Ok(self.inner.read().await.carts.get(&user_id).cloned())
    }

    async fn upsert(&self, cart: &Cart, expected_revision: Option<u64>) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if let Some(expected) = expected_revision {
            let stored = db.carts.get(&cart.user_id()).map_or(0, Cart::revision);
            if stored != expected {
                return Err(StoreError::Conflict(format!("cart revision is {stored}, expected {expected}")));
            }
        }
        db.carts.insert(cart.user_id(), cart.without_snapshots());
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &Order) -> StoreResult<()> {
        self.inner.write().await.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        match db.orders.get_mut(&order.id()) {
            Some(existing) => { *existing = order.clone(); Ok(()) }
            None => Err(StoreError::Query(format!("order {} vanished during update", order.id()))),
        }
    }

    async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list(&self, user_id: Option<UserId>, page: PageRequest, sort: Sort<OrderSortField>) -> StoreResult<Page<Order>> {
        let mut rows: Vec<Order> = self.inner.read().await.orders.values()
            .filter(|o| user_id.map_or(true, |u| o.user_id() == u))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let ordering = match sort.field {
                OrderSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
                OrderSortField::TotalAmount => a.total_amount().cmp(&b.total_amount()),
                OrderSortField::Status => a.status().as_str().cmp(b.status().as_str()),
                OrderSortField::PaymentStatus => a.payment_status().as_str().cmp(b.payment_status().as_str()),
            };
            directed(ordering.then(a.id().cmp(&b.id())), sort.direction)
        });
        Ok(paginate(rows, page))
    }

    async fn latest_for_user(&self, user_id: UserId) -> StoreResult<Option<Order>> {
        Ok(self.inner.read().await.orders.values()
            .filter(|o| o.user_id() == user_id)
            .max_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(&b.id())))
            .cloned())
    }

    async fn delete(&self, id: OrderId) -> StoreResult<bool> {
        Ok(self.inner.write().await.orders.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().await.orders.len() as u64)
    }

    async fn paid_revenue(&self) -> StoreResult<Decimal> {
        self.inner.read().await.orders.values()
            .filter(|o| o.is_paid())
            .try_fold(Decimal::ZERO, |acc, o| acc.checked_add(o.total_amount().amount()))
            .ok_or_else(|| StoreError::Query("paid revenue overflows".into()))
    }

    async fn monthly_paid_sales(&self, since: DateTime<Utc>) -> StoreResult<Vec<MonthlySales>> {
        let db = self.inner.read().await;
        bucket_monthly(db.orders.values()
            .filter(|o| o.is_paid() && o.created_at() >= since)
            .map(|o| (o.created_at(), o.total_amount().amount())))
            .map_err(|e| StoreError::Query(format!("monthly sales: {e}")))
    }

    async fn status_breakdown(&self) -> StoreResult<Vec<StatusCount>> {
        let db = self.inner.read().await;
        let mut counts: HashMap<OrderStatus, u64> = HashMap::new();
        for order in db.orders.values() { *counts.entry(order.status()).or_default() += 1; }
        let mut breakdown: Vec<StatusCount> = counts.into_iter().map(|(status, count)| StatusCount { status, count }).collect();
        breakdown.sort_by_key(|s| s.status);
        Ok(breakdown)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert(&self, session: &Session) -> StoreResult<()> {
        self.inner.write().await.sessions.insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(self.inner.read().await.sessions.get(token_hash).cloned())
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        self.inner.write().await.sessions.remove(token_hash);
        Ok(())
    }
}
