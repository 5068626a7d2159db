//! Cart service
//!
//! Every write is a read-modify-write of the whole cart document. Concurrent
//! writers without a revision race and the last one wins; callers that pass
//! `expected_revision` get a `Conflict` instead.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::{Cart, CartLine, Principal, Product, ProductId, UserId};
use crate::error::{AppError, Result};
use crate::messaging::EventPublisher;
use crate::store::{CartRepository, OrderRepository, ProductRepository, Stores};

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    events: EventPublisher,
}

/// A cart as read for modification, with the revision currently persisted
/// (0 when no document exists).
struct Loaded {
    cart: Cart,
    stored: u64,
}

impl CartService {
    pub fn new(stores: &Stores, events: EventPublisher) -> Self {
        Self {
            carts: stores.carts.clone(),
            products: stores.products.clone(),
            orders: stores.orders.clone(),
            events,
        }
    }

    /// The caller's cart with product snapshots filled in.
    pub async fn get(&self, principal: &Principal) -> Result<Cart> {
        let Loaded { cart, .. } = self.load(principal.user_id).await?;
        self.hydrate(cart).await
    }

    /// Replace the whole item set.
    pub async fn set_items(&self, principal: &Principal, lines: Vec<CartLine>, expected_revision: Option<u64>) -> Result<Cart> {
        let Loaded { mut cart, stored } = self.load(principal.user_id).await?;
        if let Some(expected) = expected_revision {
            if expected != cart.revision() {
                return Err(AppError::Conflict(format!("cart is at revision {}, not {expected}", cart.revision())));
            }
        }

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let prices: HashMap<ProductId, _> = self.products.find_many(&ids).await?
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| (p.id, p.price))
            .collect();
        cart.set_items(lines, |id| prices.get(id).copied())?;

        self.carts.upsert(&cart, expected_revision.map(|_| stored)).await?;
        tracing::debug!(user_id = %principal.user_id, revision = cart.revision(), lines = cart.line_count(), "cart replaced");
        self.hydrate(cart).await
    }

    /// Add one unit of a product.
    pub async fn add_one(&self, principal: &Principal, product_id: ProductId) -> Result<Cart> {
        let product = self.available(product_id).await?;
        let Loaded { mut cart, .. } = self.load(principal.user_id).await?;
        cart.add_one(&product)?;
        if let Some(quantity) = cart.quantity_of(&product_id) {
            if product.would_oversell(quantity) {
                tracing::warn!(%product_id, quantity, stock = product.stock, "cart quantity exceeds stock");
            }
        }
        self.carts.upsert(&cart, None).await?;
        self.hydrate(cart).await
    }

    /// Set one line's quantity; zero drops the line.
    pub async fn set_quantity(&self, principal: &Principal, product_id: ProductId, quantity: u32) -> Result<Cart> {
        let Loaded { mut cart, .. } = self.load(principal.user_id).await?;
        cart.set_quantity(&product_id, quantity)?;
        self.carts.upsert(&cart, None).await?;
        self.hydrate(cart).await
    }

    pub async fn remove(&self, principal: &Principal, product_id: ProductId) -> Result<Cart> {
        let Loaded { mut cart, .. } = self.load(principal.user_id).await?;
        if cart.remove(&product_id) {
            self.carts.upsert(&cart, None).await?;
        }
        self.hydrate(cart).await
    }

    /// Empty the cart. The document stays so its revision keeps counting.
    pub async fn clear(&self, principal: &Principal) -> Result<()> {
        let Loaded { mut cart, .. } = self.load(principal.user_id).await?;
        if cart.clear() {
            self.carts.upsert(&cart, None).await?;
            self.events.publish(DomainEvent::Cart(CartEvent::Cleared { user_id: principal.user_id })).await;
        }
        Ok(())
    }

    /// Empty the cart a checkout consumed, but only while it is still at
    /// `revision`. Returns whether the cart was emptied; a cart edited since
    /// is left as it is.
    pub(crate) async fn clear_consumed(&self, principal: &Principal, revision: u64) -> Result<bool> {
        match self.carts.find(principal.user_id).await? {
            Some(cart) if cart.revision() == revision => {
                self.discard(cart).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Read the stored cart, emptying it first if a checkout already consumed
    /// this revision but failed to clear it.
    async fn load(&self, user_id: UserId) -> Result<Loaded> {
        let consumed = self.orders.latest_for_user(user_id).await?.and_then(|o| o.cart_revision());
        match self.carts.find(user_id).await? {
            Some(cart) if Some(cart.revision()) == consumed => {
                let cart = self.discard(cart).await?;
                tracing::info!(%user_id, revision = cart.revision(), "emptied cart already checked out");
                Ok(Loaded { stored: cart.revision(), cart })
            }
            Some(cart) => Ok(Loaded { stored: cart.revision(), cart }),
            // Never written: start after the last consumed revision so the
            // new cart can not be mistaken for the one that order came from.
            None => Ok(Loaded { cart: Cart::restore(user_id, Vec::new(), consumed.unwrap_or(0), Utc::now()), stored: 0 }),
        }
    }

    /// Empty `cart` in place, provided nobody wrote it since it was read.
    async fn discard(&self, mut cart: Cart) -> Result<Cart> {
        let user_id = cart.user_id();
        let read_at = cart.revision();
        if cart.clear() {
            self.carts.upsert(&cart, Some(read_at)).await?;
            self.events.publish(DomainEvent::Cart(CartEvent::Cleared { user_id })).await;
        }
        Ok(cart)
    }

    async fn available(&self, product_id: ProductId) -> Result<Product> {
        let product = self.products.find_by_id(product_id).await?.ok_or(AppError::NotFound("Product"))?;
        if !product.is_active {
            return Err(AppError::validation(format!("product {product_id} is not available")));
        }
        Ok(product)
    }

    async fn hydrate(&self, mut cart: Cart) -> Result<Cart> {
        if cart.is_empty() { return Ok(cart); }
        let ids: Vec<ProductId> = cart.items().iter().map(|i| i.product_id).collect();
        let products: HashMap<ProductId, Product> = self.products.find_many(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        for item in cart.items_mut() {
            item.product = products.get(&item.product_id).map(Product::snapshot);
        }
        Ok(cart)
    }
}
