// Initialize logging and configuration, connect both databases, start the
// event sync loop, and shut it down cleanly on ctrl-c within the grace
// period.

use std::sync::Arc;

use sukuk_data_service::config::Config;
use sukuk_data_service::db::connection;
use sukuk_data_service::indexer::{IndexerQueries, TableDiscovery};
use sukuk_data_service::state::AppState;
use sukuk_data_service::sync;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sukuk-data-service");

    let config = Config::from_env();

    let db_pool = connection::establish_primary(&config).await?;
    info!("Primary database connected, schema applied");

    let discovery = Arc::new(TableDiscovery::new(&config.indexer_database_url));
    let queries = Arc::new(IndexerQueries::new(
        Arc::clone(&discovery),
        config.discovery_cache_ttl,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        db_pool,
        queries,
    });

    let shutdown = CancellationToken::new();
    let sync_state = Arc::clone(&state);
    let sync_shutdown = shutdown.clone();
    let sync_handle = tokio::spawn(async move {
        sync::start_sync(sync_state, sync_shutdown).await;
    });
    info!("Event sync loop started");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    if tokio::time::timeout(config.shutdown_grace, sync_handle)
        .await
        .is_err()
    {
        warn!(
            "Sync loop did not stop within {:?}; exiting anyway",
            config.shutdown_grace
        );
    }

    info!("Shutdown complete");
    Ok(())
}
