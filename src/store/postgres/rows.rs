//! Row shapes for the Postgres adapter and their mapping into the domain.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Cart, CartItem, Email, Money, Order, OrderLine, Product, ShippingAddress, User,
};
use crate::store::{Session, StoreError};

fn corrupt(what: &str, id: Uuid, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what} {id}: {err}"))
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id.into(),
            email: Email::parse(&r.email).map_err(|e| corrupt("user", r.id, e))?,
            role: r.role.parse().map_err(|e| corrupt("user", r.id, e))?,
            first_name: r.first_name,
            last_name: r.last_name,
            password_hash: r.password_hash,
            is_blocked: r.is_blocked,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock: i64,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: r.id.into(),
            price: Money::new(r.price).map_err(|e| corrupt("product", r.id, e))?,
            stock: u32::try_from(r.stock).map_err(|e| corrupt("product", r.id, e))?,
            name: r.name,
            description: r.description,
            category: r.category,
            image: r.image,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CartRow {
    pub user_id: Uuid,
    pub items: Json<Vec<CartItem>>,
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;
    fn try_from(r: CartRow) -> Result<Self, Self::Error> {
        let revision = u64::try_from(r.revision).map_err(|e| corrupt("cart", r.user_id, e))?;
        Ok(Cart::restore(r.user_id.into(), r.items.0, revision, r.updated_at))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<OrderLine>>,
    pub total_amount: Decimal,
    pub shipping_address: Json<ShippingAddress>,
    pub payment_method: String,
    pub status: String,
    pub payment_status: String,
    pub cart_revision: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let cart_revision = r.cart_revision.map(u64::try_from).transpose().map_err(|e| corrupt("order", r.id, e))?;
        Ok(Order::restore(
            r.id.into(),
            r.user_id.into(),
            r.items.0,
            Money::new(r.total_amount).map_err(|e| corrupt("order", r.id, e))?,
            r.shipping_address.0,
            r.payment_method.parse().map_err(|e| corrupt("order", r.id, e))?,
            r.status.parse().map_err(|e| corrupt("order", r.id, e))?,
            r.payment_status.parse().map_err(|e| corrupt("order", r.id, e))?,
            cart_revision,
            r.created_at,
            r.updated_at,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionRow {
    pub token_hash: String,
    pub user_id: Uuid,
    pub impersonator: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(r: SessionRow) -> Self {
        Session {
            token_hash: r.token_hash,
            user_id: r.user_id.into(),
            impersonator: r.impersonator.map(Into::into),
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

/// `u64` counters are stored as `BIGINT`.
pub fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|e| StoreError::Query(format!("value {value} out of range: {e}")))
}
