//! donut-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use donut_gateway::api;
use donut_gateway::app_state::AppState;
use donut_gateway::config::{DonutConfig, LogFormat, StorageBackend};
use donut_gateway::domain::NotificationBus;
use donut_gateway::service::{DonutService, PairingRng};
use donut_gateway::storage::{MemoryStorage, PostgresStorage, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = DonutConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.storage_backend, "starting donut-gateway");

    // Build storage layer
    let storage: Arc<dyn Storage> = match config.storage_backend {
        StorageBackend::Postgres => {
            let postgres = PostgresStorage::connect(&config)
                .await
                .context("failed to connect to PostgreSQL")?;
            if config.database_run_migrations {
                postgres
                    .run_migrations()
                    .await
                    .context("failed to run migrations")?;
                tracing::info!("migrations applied");
            }
            Arc::new(postgres)
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; state is lost on exit");
            Arc::new(MemoryStorage::new())
        }
    };

    // Build service layer
    let rng: PairingRng = match config.pairing_rng_seed {
        Some(seed) => {
            tracing::info!(seed, "pairing generator seeded");
            Box::new(StdRng::seed_from_u64(seed))
        }
        None => Box::new(StdRng::from_entropy()),
    };
    let notification_bus = NotificationBus::new(config.notification_bus_capacity);
    let donut_service = Arc::new(DonutService::with_rng(storage, notification_bus, rng));

    // Build router
    let app = api::build_app(AppState::new(donut_service), config.request_timeout());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
