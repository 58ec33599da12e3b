//! Boundary Secrets Engine API Server
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8200, in-memory storage)
//! cargo run --bin boundary-secrets-server
//!
//! # Persist config and roles
//! cargo run --bin boundary-secrets-server -- --storage-path /var/lib/boundary-secrets
//!
//! # Enable debug logging
//! RUST_LOG=debug cargo run --bin boundary-secrets-server
//! ```

use anyhow::Result;
use boundary_secrets_api::{build_router, AppState, ServerConfig};
use boundary_secrets_engine::client::HttpClientFactory;
use boundary_secrets_engine::BoundaryBackend;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_tracing(&config);

    info!("Starting Boundary secrets engine API server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let storage = config.open_storage()?;
    match &config.storage_path {
        Some(path) => info!(path = %path.display(), "Using sled storage"),
        None => info!("Using in-memory storage"),
    }

    let factory = Arc::new(HttpClientFactory::new(config.remote_timeout()));
    let state = AppState::new(BoundaryBackend::new(storage, factory));
    let app = build_router(state);

    let bind_addr = config.bind_address();
    info!("Listening on http://{}", bind_addr);
    info!("Swagger UI: http://{}/swagger-ui", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
    }
}

fn init_tracing(config: &ServerConfig) {
    if config.tracing_level().is_none() {
        eprintln!("Invalid log level '{}', using 'info'", config.log_level);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.filter_directives().into());

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
