use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use invoicer_api::config;
use invoicer_api::database::{seed::seed, MemoryStore, PgStore, Store};
use invoicer_api::{app, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("invoicer_api=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    info!("Starting Invoicer API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set");
    }

    let store: Arc<dyn Store> = match config.database.url {
        Some(_) => Arc::new(
            PgStore::connect(&config.database)
                .await
                .context("connecting to DATABASE_URL")?,
        ),
        None if is_production!() => bail!("DATABASE_URL is required in production"),
        None => {
            warn!("DATABASE_URL not set, data lives in memory and is lost on exit");
            let store = MemoryStore::new();
            seed(&store, &config.seed).await.context("seeding in-memory store")?;
            Arc::new(store)
        }
    };
    info!("Using {} store", store.backend());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Invoicer API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(store, config))).await?;
    Ok(())
}
