//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;
use crate::domain::value_objects::{Money, OrderId, ProductId, UserId, ValueError};

/// Immutable record of a completed purchase intent.
///
/// Line items, unit prices and the total are fixed at creation; afterwards
/// only `status` and `payment_status` move, through [`Order::apply`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderLine>,
    total_amount: Money,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    status: OrderStatus,
    payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cart_revision: Option<u64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Result<Money, ValueError> { self.unit_price.checked_multiply(self.quantity) }
}

/// Free-form delivery address. Presence is checked, format is not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "full_name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[serde(alias = "postalCode")]
    #[validate(length(min = 1, message = "postal_code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
}

impl ShippingAddress {
    /// Trim every field so whitespace-only values count as missing.
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid }

/// Display label only; no payment is ever captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { #[default] CashOnDelivery, Upi, Card }

/// Admin-only status change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    #[serde(alias = "paymentStatus")]
    pub payment_status: Option<PaymentStatus>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool { self.status.is_none() && self.payment_status.is_none() }
}

impl Order {
    /// Place a new order. The total is always derived from the line snapshots.
    pub fn place(
        user_id: UserId,
        items: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        if let Some(line) = items.iter().find(|l| l.quantity == 0) {
            return Err(OrderError::InvalidQuantity(line.product_id));
        }
        let shipping_address = shipping_address.normalized();
        shipping_address.validate().map_err(|e| OrderError::IncompleteShipping(e.to_string()))?;

        let total_amount = items.iter().try_fold(Money::zero(), |acc, line| acc.checked_add(&line.line_total()?))?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(), user_id, items, total_amount, shipping_address, payment_method,
            status: OrderStatus::Processing, payment_status: PaymentStatus::Pending,
            cart_revision: None, created_at: now, updated_at: now,
        })
    }

    /// Record the cart revision this order consumed at checkout.
    pub fn from_cart_revision(mut self, revision: u64) -> Self {
        self.cart_revision = Some(revision);
        self
    }

    /// Rebuild an order from its stored parts.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId, user_id: UserId, items: Vec<OrderLine>, total_amount: Money,
        shipping_address: ShippingAddress, payment_method: PaymentMethod, status: OrderStatus,
        payment_status: PaymentStatus, cart_revision: Option<u64>,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id, user_id, items, total_amount, shipping_address, payment_method, status, payment_status, cart_revision, created_at, updated_at }
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn total_amount(&self) -> Money { self.total_amount }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn cart_revision(&self) -> Option<u64> { self.cart_revision }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_paid(&self) -> bool { self.payment_status == PaymentStatus::Paid }

    /// Merge an admin patch. Only the two status fields can change.
    pub fn apply(&mut self, patch: &OrderPatch) {
        if let Some(status) = patch.status { self.status = status; }
        if let Some(payment) = patch.payment_status { self.payment_status = payment; }
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];
    pub fn as_str(&self) -> &'static str {
        match self { Self::Processing => "Processing", Self::Shipped => "Shipped", Self::Delivered => "Delivered", Self::Cancelled => "Cancelled" }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid" }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::CashOnDelivery => "cash_on_delivery", Self::Upi => "upi", Self::Card => "card" }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| OrderError::UnknownValue(s.to_string()))
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "pending" => Ok(Self::Pending), "paid" => Ok(Self::Paid), other => Err(OrderError::UnknownValue(other.to_string())) }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "upi" => Ok(Self::Upi),
            "card" => Ok(Self::Card),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("an order needs at least one item")]
    NoItems,
    #[error("quantity for product {0} must be at least 1")]
    InvalidQuantity(ProductId),
    #[error("incomplete shipping address: {0}")]
    IncompleteShipping(String),
    #[error("unknown value: {0}")]
    UnknownValue(String),
    #[error("order total: {0}")]
    Amount(#[from] ValueError),
}
