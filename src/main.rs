use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lifeos_api::app::{app, AppState};
use lifeos_api::config::config;
use lifeos_api::database::DatabaseManager;
use lifeos_api::jobs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lifeos_api=info,tower_http=info")),
        )
        .init();

    let config = config();
    info!("Starting LifeOS API in {:?} mode", config.environment);

    let state = AppState::from_config(config).context("failed to build application state")?;

    if config.database.run_migrations {
        // A missing database should not keep the server down; /health reports it.
        if let Err(e) = DatabaseManager::migrate(&state.pool).await {
            tracing::error!("Migrations failed: {}", e);
        }
    }

    let _jobs = jobs::spawn_all(state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("LifeOS API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
