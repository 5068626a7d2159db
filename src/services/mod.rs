//! Application services: one per module of the API, each taking the caller's
//! [`Principal`] explicitly and talking to storage only through the ports in
//! [`crate::store`].

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod users;

use std::sync::Arc;

use crate::domain::Principal;
use crate::error::{AppError, Result};
use crate::messaging::EventPublisher;
use crate::store::Stores;

pub use admin::AdminService;
pub use auth::{AuthService, AuthSettings};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::{CheckoutRequest, CheckoutService};
pub use orders::{CreateOrderRequest, OrderService};
pub use users::UserService;

pub(crate) fn require_admin(principal: &Principal) -> Result<()> {
    if principal.is_admin() { Ok(()) } else { Err(AppError::forbidden("admin access required")) }
}

/// Every service wired over one set of stores.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub users: Arc<UserService>,
    pub admin: Arc<AdminService>,
}

impl Services {
    pub fn new(stores: &Stores, auth: AuthSettings, events: EventPublisher) -> Self {
        let auth = Arc::new(AuthService::new(stores, auth));
        let carts = Arc::new(CartService::new(stores, events.clone()));
        let orders = Arc::new(OrderService::new(stores, events.clone()));
        Self {
            catalog: Arc::new(CatalogService::new(stores, events)),
            checkout: Arc::new(CheckoutService::new(carts.clone(), orders.clone())),
            users: Arc::new(UserService::new(stores)),
            admin: Arc::new(AdminService::new(stores, auth.clone())),
            auth,
            carts,
            orders,
        }
    }
}
