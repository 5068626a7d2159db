//! Domain events
use crate::domain::aggregates::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::{OrderId, ProductId, UserId};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Cart(CartEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: ProductId, name: String },
    Updated { product_id: ProductId },
    Deleted { product_id: ProductId },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, user_id: UserId, total: Decimal },
    Updated { order_id: OrderId, status: OrderStatus, payment_status: PaymentStatus },
    Deleted { order_id: OrderId },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    Cleared { user_id: UserId },
}

impl DomainEvent {
    /// Messaging subject, `inventory.<aggregate>.<event>`.
    pub fn subject(&self) -> String {
        let (aggregate, event) = match self {
            Self::Product(ProductEvent::Created { .. }) => ("product", "created"),
            Self::Product(ProductEvent::Updated { .. }) => ("product", "updated"),
            Self::Product(ProductEvent::Deleted { .. }) => ("product", "deleted"),
            Self::Order(OrderEvent::Placed { .. }) => ("order", "placed"),
            Self::Order(OrderEvent::Updated { .. }) => ("order", "updated"),
            Self::Order(OrderEvent::Deleted { .. }) => ("order", "deleted"),
            Self::Cart(CartEvent::Cleared { .. }) => ("cart", "cleared"),
        };
        format!("inventory.{aggregate}.{event}")
    }
}
