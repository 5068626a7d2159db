//! Order service

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::query::{OrderSortField, Page, PageRequest, Sort};
use crate::domain::{
    Order, OrderError, OrderId, OrderLine, OrderPatch, PaymentMethod, Principal, Product, ProductId, ShippingAddress,
};
use crate::error::{AppError, Result};
use crate::messaging::EventPublisher;
use crate::services::require_admin;
use crate::store::{OrderRepository, ProductRepository, Stores};

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    #[serde(alias = "productId")]
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Body of `POST /orders`. Prices and totals are never taken from the
/// client; unknown fields such as a `total_amount` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default, alias = "shippingAddress")]
    pub shipping_address: ShippingAddress,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: PaymentMethod,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(stores: &Stores, events: EventPublisher) -> Self {
        Self { orders: stores.orders.clone(), products: stores.products.clone(), events }
    }

    pub async fn create(&self, principal: &Principal, request: CreateOrderRequest) -> Result<Order> {
        let lines = request.items.into_iter().map(|i| (i.product_id, i.quantity)).collect();
        self.place(principal, lines, request.shipping_address, request.payment_method, None).await
    }

    /// Price `lines` against the live catalog and persist the order.
    pub(crate) async fn place(
        &self,
        principal: &Principal,
        lines: Vec<(ProductId, i64)>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        cart_revision: Option<u64>,
    ) -> Result<Order> {
        if lines.is_empty() { return Err(OrderError::NoItems.into()); }
        let mut quantities = Vec::with_capacity(lines.len());
        for (product_id, quantity) in lines {
            let quantity = u32::try_from(quantity).ok().filter(|q| *q >= 1).ok_or(OrderError::InvalidQuantity(product_id))?;
            quantities.push((product_id, quantity));
        }

        let ids: Vec<ProductId> = quantities.iter().map(|(id, _)| *id).collect();
        let catalog: HashMap<ProductId, Product> = self.products.find_many(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        let mut items = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in quantities {
            let product = catalog
                .get(&product_id)
                .filter(|p| p.is_active)
                .ok_or_else(|| AppError::validation(format!("product {product_id} is not available")))?;
            if product.would_oversell(quantity) {
                tracing::warn!(%product_id, quantity, stock = product.stock, "order quantity exceeds stock");
            }
            items.push(OrderLine { product_id, name: product.name.clone(), quantity, unit_price: product.price });
        }

        let mut order = Order::place(principal.user_id, items, shipping_address, payment_method)?;
        if let Some(revision) = cart_revision {
            order = order.from_cart_revision(revision);
        }
        self.orders.insert(&order).await?;
        tracing::info!(order_id = %order.id(), user_id = %order.user_id(), total = %order.total_amount(), "order placed");
        self.events
            .publish(DomainEvent::Order(OrderEvent::Placed {
                order_id: order.id(),
                user_id: order.user_id(),
                total: order.total_amount().amount(),
            }))
            .await;
        Ok(order)
    }

    /// Own orders for customers, every order for admins.
    pub async fn list_for_user(&self, principal: &Principal, page: PageRequest, sort: Sort<OrderSortField>) -> Result<Page<Order>> {
        let owner = if principal.is_admin() { None } else { Some(principal.user_id) };
        Ok(self.orders.list(owner, page, sort).await?)
    }

    pub async fn get_by_id(&self, principal: &Principal, id: OrderId) -> Result<Order> {
        let order = self.orders.find_by_id(id).await?.ok_or(AppError::NotFound("Order"))?;
        if !principal.can_view(&order) {
            return Err(AppError::forbidden("not allowed to view this order"));
        }
        Ok(order)
    }

    pub async fn update_status(&self, principal: &Principal, id: OrderId, patch: OrderPatch) -> Result<Order> {
        require_admin(principal)?;
        if patch.is_empty() { return Err(AppError::validation("nothing to update: set status or payment_status")); }
        let mut order = self.orders.find_by_id(id).await?.ok_or(AppError::NotFound("Order"))?;
        order.apply(&patch);
        self.orders.update(&order).await?;
        tracing::info!(order_id = %id, status = %order.status(), payment_status = order.payment_status().as_str(), "order updated");
        self.events
            .publish(DomainEvent::Order(OrderEvent::Updated { order_id: id, status: order.status(), payment_status: order.payment_status() }))
            .await;
        Ok(order)
    }

    pub async fn delete(&self, principal: &Principal, id: OrderId) -> Result<()> {
        require_admin(principal)?;
        if !self.orders.delete(id).await? { return Err(AppError::NotFound("Order")); }
        tracing::info!(order_id = %id, "order deleted");
        self.events.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: id })).await;
        Ok(())
    }
}
