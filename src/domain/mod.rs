//! Inventory domain: aggregates, value objects and the checkout workflow.

pub mod aggregates;
pub mod checkout;
pub mod events;
pub mod query;
pub mod stats;
pub mod value_objects;

pub use aggregates::*;
pub use value_objects::{Email, Money, OrderId, ProductId, UserId, ValueError};
