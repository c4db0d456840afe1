use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tech_digest::aggregator::Aggregator;
use tech_digest::config::Config;
use tech_digest::routes::{self, AppState};
use tech_digest::sources::build_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tech_digest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("DIGEST_CONFIG").unwrap_or_else(|_| "digest.toml".to_string());
    let mut config = Config::load(&config_path)?;
    config.apply_env();
    info!(
        "Loaded configuration from {} ({} default sources)",
        config_path,
        config.sources.len()
    );

    // One HTTP client for the whole process, shared by every adapter
    let client = build_client(&config)?;
    let aggregator = Arc::new(Aggregator::new(client, &config));
    info!("Per-source timeout: {:?}", aggregator.timeout());

    let state = Arc::new(AppState {
        aggregator,
        default_sources: config.sources.clone(),
    });

    let app = routes::router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
