//! OpenSASE Inventory - self-hosted storefront inventory and order service
//!
//! ## Features
//! - Product catalog with admin management
//! - Per-user server-side carts with optional revision-checked writes
//! - Checkout turning a cart into an order
//! - Order history, status management and admin dashboard stats
//! - Bearer-token sessions with admin impersonation

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod messaging;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::{AppError, Result};
pub use http::{router, AppState};
pub use messaging::EventPublisher;
pub use services::{AuthSettings, Services};
pub use store::Stores;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the `fmt` subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
