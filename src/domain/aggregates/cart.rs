//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use crate::domain::aggregates::product::{Product, ProductSnapshot};
use crate::domain::value_objects::{Money, ProductId, UserId, ValueError};

/// A user's working set of intended purchases.
///
/// `revision` increases on every mutation. Clients may send the revision they
/// last read to turn a whole-cart replace into a conditional write; orders
/// placed through checkout record the revision they consumed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    revision: u64,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_add: Money,
    /// Populated on reads, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
}

impl CartItem {
    pub fn line_total(&self) -> Result<Money, ValueError> { self.price_at_add.checked_multiply(self.quantity) }
}

/// Client-submitted line: a product reference and a requested quantity.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CartLine {
    #[serde(alias = "productId")]
    pub product_id: ProductId,
    pub quantity: i64,
}

impl Cart {
    pub fn empty(user_id: UserId) -> Self {
        Self { user_id, items: vec![], revision: 0, updated_at: Utc::now() }
    }

    /// Rebuild a cart from its stored parts.
    pub fn restore(user_id: UserId, items: Vec<CartItem>, revision: u64, updated_at: DateTime<Utc>) -> Self {
        Self { user_id, items, revision, updated_at }
    }

    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn items_mut(&mut self) -> &mut [CartItem] { &mut self.items }
    pub fn revision(&self) -> u64 { self.revision }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn subtotal(&self) -> Result<Money, CartError> { subtotal_of(&self.items) }

    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.items.iter().find(|i| &i.product_id == product_id).map(|i| i.quantity)
    }

    /// Replace the whole line-item set.
    ///
    /// Lines already in the cart keep their `price_at_add`; new lines take the
    /// price returned by `current_price`, which yields `None` for products that
    /// do not resolve. Nothing changes unless every line is valid.
    pub fn set_items<F>(&mut self, lines: Vec<CartLine>, current_price: F) -> Result<(), CartError>
    where
        F: Fn(&ProductId) -> Option<Money>,
    {
        let mut seen = HashSet::with_capacity(lines.len());
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if !seen.insert(line.product_id) { return Err(CartError::DuplicateItem(line.product_id)); }
            let quantity = u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q >= 1)
                .ok_or(CartError::InvalidQuantity { product_id: line.product_id, quantity: line.quantity })?;
            let price_at_add = match self.items.iter().find(|i| i.product_id == line.product_id) {
                Some(existing) => existing.price_at_add,
                None => current_price(&line.product_id).ok_or(CartError::UnknownProduct(line.product_id))?,
            };
            items.push(CartItem { product_id: line.product_id, quantity, price_at_add, product: None });
        }
        self.replace(items)
    }

    /// Increment the product's line by one, or add it at the current price.
    pub fn add_one(&mut self, product: &Product) -> Result<(), CartError> {
        let mut items = self.items.clone();
        match items.iter_mut().find(|i| i.product_id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
            None => items.push(CartItem { product_id: product.id, quantity: 1, price_at_add: product.price, product: None }),
        }
        self.replace(items)
    }

    /// Set a line's quantity; zero removes the line.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        let mut items = self.items.clone();
        let position = items.iter().position(|i| &i.product_id == product_id).ok_or(CartError::ItemNotFound(*product_id))?;
        if quantity == 0 { items.remove(position); }
        else { items[position].quantity = quantity; }
        self.replace(items)
    }

    /// Drop the product's line. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed { self.bump(); }
        removed
    }

    /// Drop every line. The revision still advances, so a client holding an
    /// older revision cannot write over whatever the cart holds next.
    pub fn clear(&mut self) -> bool {
        if self.items.is_empty() { return false; }
        self.items.clear();
        self.bump();
        true
    }

    /// Copy of the cart with display snapshots stripped, as it is stored.
    pub fn without_snapshots(&self) -> Self {
        let mut cart = self.clone();
        for item in &mut cart.items { item.product = None; }
        cart
    }

    fn replace(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        subtotal_of(&items)?;
        self.items = items;
        self.bump();
        Ok(())
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }
}

fn subtotal_of(items: &[CartItem]) -> Result<Money, CartError> {
    items.iter().try_fold(Money::zero(), |acc, item| Ok(acc.checked_add(&item.line_total()?)?))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity for product {product_id} must be at least 1, got {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },
    #[error("product {0} appears more than once")]
    DuplicateItem(ProductId),
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),
    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
    #[error("cart subtotal: {0}")]
    Amount(#[from] ValueError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::ProductDraft;
    use rust_decimal::Decimal;

    fn product(name: &str, price: i64) -> Product {
        Product::create(ProductDraft { name: name.into(), price: Decimal::new(price, 0), stock: 10, ..Default::default() }).unwrap()
    }

    #[test]
    fn test_add_one_twice_merges() {
        let p = product("Widget", 10);
        let mut cart = Cart::empty(UserId::generate());
        cart.add_one(&p).unwrap();
        cart.add_one(&p).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.quantity_of(&p.id), Some(2));
        assert_eq!(cart.subtotal().unwrap().amount(), Decimal::new(20, 0));
        assert_eq!(cart.revision(), 2);
    }

    #[test]
    fn test_remove_present_and_absent() {
        let a = product("A", 1);
        let b = product("B", 2);
        let mut cart = Cart::empty(UserId::generate());
        cart.add_one(&a).unwrap();
        assert!(!cart.remove(&b.id));
        assert_eq!(cart.revision(), 1);
        assert!(cart.remove(&a.id));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_items_keeps_price_at_add() {
        let a = product("A", 10);
        let b = product("B", 5);
        let mut cart = Cart::empty(UserId::generate());
        cart.add_one(&a).unwrap();

        let lines = vec![
            CartLine { product_id: a.id, quantity: 3 },
            CartLine { product_id: b.id, quantity: 1 },
        ];
        // catalog price of A has since moved to 99
        cart.set_items(lines, |id| Some(Money::new(Decimal::new(if *id == a.id { 99 } else { 5 }, 0)).unwrap())).unwrap();
        assert_eq!(cart.items()[0].price_at_add.amount(), Decimal::new(10, 0));
        assert_eq!(cart.items()[1].price_at_add.amount(), Decimal::new(5, 0));
        assert_eq!(cart.subtotal().unwrap().amount(), Decimal::new(35, 0));
    }

    #[test]
    fn test_set_items_rejects_without_mutating() {
        let a = product("A", 10);
        let mut cart = Cart::empty(UserId::generate());
        cart.add_one(&a).unwrap();
        let before = cart.clone();

        let zero = vec![CartLine { product_id: a.id, quantity: 0 }];
        assert!(matches!(cart.set_items(zero, |_| None), Err(CartError::InvalidQuantity { .. })));

        let dup = vec![CartLine { product_id: a.id, quantity: 1 }, CartLine { product_id: a.id, quantity: 2 }];
        assert_eq!(cart.set_items(dup, |_| None), Err(CartError::DuplicateItem(a.id)));

        let unknown = ProductId::generate();
        let lines = vec![CartLine { product_id: unknown, quantity: 1 }];
        assert_eq!(cart.set_items(lines, |_| None), Err(CartError::UnknownProduct(unknown)));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let a = product("A", 10);
        let mut cart = Cart::empty(UserId::generate());
        cart.add_one(&a).unwrap();
        cart.set_quantity(&a.id, 4).unwrap();
        assert_eq!(cart.quantity_of(&a.id), Some(4));
        cart.set_quantity(&a.id, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(&a.id, 1), Err(CartError::ItemNotFound(a.id)));
    }

    #[test]
    fn test_clear_advances_revision() {
        let a = product("A", 10);
        let mut cart = Cart::empty(UserId::generate());
        assert!(!cart.clear());
        assert_eq!(cart.revision(), 0);
        cart.add_one(&a).unwrap();
        assert!(cart.clear());
        assert!(cart.is_empty());
        assert_eq!(cart.revision(), 2);
    }

    #[test]
    fn test_subtotal_overflow_rejected_without_mutating() {
        let mut huge = product("Huge", 1);
        huge.price = Money::new(Decimal::MAX).unwrap();
        let mut cart = Cart::empty(UserId::generate());
        cart.add_one(&huge).unwrap();
        let before = cart.clone();

        assert_eq!(cart.add_one(&huge), Err(CartError::Amount(ValueError::AmountOverflow)));
        assert_eq!(cart.set_quantity(&huge.id, 3), Err(CartError::Amount(ValueError::AmountOverflow)));
        assert_eq!(cart, before);
    }
}
