//! Velund API Server
//!
//! HTTP API server for the Velund metal-trading marketplace.

use std::sync::Arc;
use velund_api::{create_router, state::AppState};
use velund_core::config::AppConfig;
use velund_core::PgMarketStore;
use velund_llm::OpenAiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "velund_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration once; handlers never read the environment
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Connect backing services
    let store = Arc::new(PgMarketStore::new(&config.database.url, config.database.pool_size).await?);
    let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);

    // Create application state and router
    let state = Arc::new(AppState::new(config, store, llm));
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Velund API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
