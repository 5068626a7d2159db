//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub stock: u32,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated catalog input from the admin panel.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: i64,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

/// Denormalised view of a product carried on cart lines for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Money,
    pub image: Option<String>,
    pub stock: u32,
    pub is_active: bool,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let now = Utc::now();
        Ok(Self {
            id: ProductId::generate(),
            name: validate_name(&draft.name)?,
            description: draft.description,
            price: validate_price(draft.price)?,
            category: draft.category.trim().to_string(),
            stock: validate_stock(draft.stock)?,
            image: draft.image,
            is_active: draft.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        // validate everything before touching the record
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let price = patch.price.map(validate_price).transpose()?;
        let stock = patch.stock.map(validate_stock).transpose()?;

        if let Some(name) = name { self.name = name; }
        if let Some(price) = price { self.price = price; }
        if let Some(stock) = stock { self.stock = stock; }
        if let Some(description) = patch.description { self.description = description; }
        if let Some(category) = patch.category { self.category = category.trim().to_string(); }
        if let Some(image) = patch.image { self.image = Some(image); }
        if let Some(active) = patch.is_active { self.is_active = active; }
        self.touch();
        Ok(())
    }

    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            stock: self.stock,
            is_active: self.is_active,
        }
    }

    /// Stock is advisory; this only reports whether `qty` exceeds it.
    pub fn would_oversell(&self, qty: u32) -> bool { qty > self.stock }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn validate_name(name: &str) -> Result<String, ProductError> {
    let name = name.trim();
    if name.is_empty() { return Err(ProductError::MissingName); }
    Ok(name.to_string())
}

fn validate_price(price: Decimal) -> Result<Money, ProductError> {
    Money::new(price).map_err(|_| ProductError::NegativePrice)
}

fn validate_stock(stock: i64) -> Result<u32, ProductError> {
    u32::try_from(stock).map_err(|_| ProductError::InvalidStock(stock))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("price must not be negative")]
    NegativePrice,
    #[error("stock must be a non-negative integer, got {0}")]
    InvalidStock(i64),
}
