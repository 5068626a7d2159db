//! Checkout state machine
//!
//! One attempt moves `Idle -> Submitting -> {Success, Failed}`. A failed
//! attempt may be submitted again; the cart is never touched by a failure.

use thiserror::Error;
use validator::Validate;
use crate::domain::aggregates::{Cart, Order, ShippingAddress};
use crate::domain::value_objects::{OrderId, ProductId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting { cart_revision: u64 },
    Success { order_id: OrderId },
    Failed { message: String },
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting { .. } => "submitting",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Cart contents frozen at submission: product references and quantities.
/// Prices are resolved from the catalog when the order is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrozenCart {
    pub lines: Vec<(ProductId, u32)>,
    pub revision: u64,
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Default)]
pub struct Checkout {
    state: CheckoutState,
}

impl Checkout {
    pub fn new() -> Self { Self::default() }
    pub fn state(&self) -> &CheckoutState { &self.state }

    pub fn submit(&mut self, cart: &Cart, shipping_address: ShippingAddress) -> Result<FrozenCart, CheckoutError> {
        if !matches!(self.state, CheckoutState::Idle | CheckoutState::Failed { .. }) {
            return Err(CheckoutError::InvalidTransition { from: self.state.name(), to: "submitting" });
        }
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        let shipping_address = shipping_address.normalized();
        shipping_address.validate().map_err(|e| CheckoutError::IncompleteShipping(e.to_string()))?;

        self.state = CheckoutState::Submitting { cart_revision: cart.revision() };
        Ok(FrozenCart {
            lines: cart.items().iter().map(|i| (i.product_id, i.quantity)).collect(),
            revision: cart.revision(),
            shipping_address,
        })
    }

    pub fn succeed(&mut self, order: &Order) -> Result<(), CheckoutError> {
        self.expect_submitting("success")?;
        self.state = CheckoutState::Success { order_id: order.id() };
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CheckoutError> {
        self.expect_submitting("failed")?;
        self.state = CheckoutState::Failed { message: message.into() };
        Ok(())
    }

    fn expect_submitting(&self, to: &'static str) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Submitting { .. } => Ok(()),
            _ => Err(CheckoutError::InvalidTransition { from: self.state.name(), to }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("incomplete shipping address: {0}")]
    IncompleteShipping(String),
    #[error("checkout cannot move from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}
