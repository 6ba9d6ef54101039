use std::error::Error;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use marketplace_server::config::{Config, StoreBackend};
use marketplace_server::engine::Marketplace;
use marketplace_server::routes::create_routes;
use marketplace_server::store::{MemoryStore, PgStore};
use marketplace_server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = Config::from_env()?;

    let app: Router = match config.store_backend {
        StoreBackend::Postgres => {
            let store =
                PgStore::connect(&config.database_url, config.database_max_connections).await?;
            store.migrate().await?;

            create_routes(AppState::new(Marketplace::new(store, &config)?))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            create_routes(AppState::new(Marketplace::new(MemoryStore::new(), &config)?))
        }
    };

    let addr = config.server_address()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
