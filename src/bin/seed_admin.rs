//! Create the initial admin account.
//!
//! Reads `ADMIN_EMAIL`, `ADMIN_PASSWORD`, `ADMIN_FIRST_NAME` and
//! `ADMIN_LAST_NAME` alongside the server configuration. Running it again
//! with an existing email changes nothing.

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use opensase_inventory::services::AuthService;
use opensase_inventory::{AppConfig, AuthSettings, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    opensase_inventory::init_tracing();
    let config = AppConfig::from_env()?;

    let email = std::env::var("ADMIN_EMAIL").context("ADMIN_EMAIL must be set")?;
    let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;
    let first_name = std::env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "Admin".to_string());
    let last_name = std::env::var("ADMIN_LAST_NAME").unwrap_or_default();

    let db = PgPoolOptions::new().max_connections(1).connect(config.database_url.expose_secret()).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let auth = AuthService::new(&Stores::postgres(db), AuthSettings::new(config.session_secret, config.session_ttl_hours));
    if auth.ensure_admin(&first_name, &last_name, &email, &password).await? {
        tracing::info!(%email, "admin account seeded");
    } else {
        tracing::info!(%email, "admin account already exists, nothing to do");
    }
    Ok(())
}
