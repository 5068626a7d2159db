//! OpenSASE Inventory - REST API server

use anyhow::Result;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use opensase_inventory::{router, AppConfig, AppState, AuthSettings, EventPublisher, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    opensase_inventory::init_tracing();
    let config = AppConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.expose_secret())
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let auth = AuthSettings::new(config.session_secret.clone(), config.session_ttl_hours);
    let state = AppState::new(&Stores::postgres(db), auth, events);

    let addr = config.socket_addr();
    tracing::info!(%addr, "OpenSASE Inventory listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;
    Ok(())
}
