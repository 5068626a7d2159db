//! REST surface
//!
//! Handlers stay thin: extract, call the service with the caller's
//! principal, serialize.

mod admin;
mod auth;
mod cart;
mod checkout;
pub mod extract;
mod orders;
mod products;
mod users;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::query::{PageRequest, QueryError, Sort};
use crate::messaging::EventPublisher;
use crate::services::{AuthSettings, Services};
use crate::store::Stores;

pub use extract::{AdminPrincipal, AppJson, AppPath, AppQuery, BearerToken};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(stores: &Stores, auth: AuthSettings, events: EventPublisher) -> Self {
        Self { services: Services::new(stores, auth, events) }
    }
}

/// Pagination and sorting query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    #[serde(alias = "limit", alias = "perPage")]
    pub per_page: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ListParams {
    pub fn page_request(&self) -> PageRequest { PageRequest::new(self.page, self.per_page) }

    pub fn sort<F>(&self) -> Result<Sort<F>, QueryError>
    where
        F: FromStr<Err = QueryError> + Default,
    {
        Sort::parse(self.sort.as_deref(), self.order.as_deref())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-inventory"})) }))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me).put(auth::update_profile))
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/:id", get(products::get_product).put(products::update_product).delete(products::delete_product))
        .route("/cart", get(cart::get_cart).post(cart::set_cart).delete(cart::clear_cart))
        .route("/cart/items/:product_id", post(cart::add_item).put(cart::set_item_quantity).delete(cart::remove_item))
        .route("/checkout", post(checkout::checkout))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/:id", get(orders::get_order).put(orders::update_order).delete(orders::delete_order))
        .route("/users", get(users::list_users))
        .route("/users/:id", put(users::update_user).delete(users::delete_user))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/impersonate/:id", post(admin::impersonate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
