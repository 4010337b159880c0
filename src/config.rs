// Runtime configuration, loaded once at startup:
// - primary database (projections, unified event log, system state)
// - indexer database (read-only, hash-prefixed event tables)
// - sync loop interval and batch size
// - discovery cache TTL and shutdown grace period

use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub primary_database_url: String,
    pub indexer_database_url: String,
    pub sync_interval: Duration,
    pub sync_batch_size: i64,
    pub discovery_cache_ttl: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let primary_database_url = env::var("PRIMARY_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/sukuk".to_string());
        let indexer_database_url = env::var("INDEXER_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5433/indexer".to_string());
        let sync_interval = env::var("SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));
        let sync_batch_size = env::var("SYNC_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);
        let discovery_cache_ttl = env::var("DISCOVERY_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));
        let shutdown_grace = env::var("SHUTDOWN_GRACE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Self {
            primary_database_url,
            indexer_database_url,
            sync_interval,
            sync_batch_size,
            discovery_cache_ttl,
            shutdown_grace,
        }
    }
}
