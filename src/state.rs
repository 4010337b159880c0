use crate::config::Config;
use crate::indexer::IndexerQueries;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared handles: the primary pool (projections, event log, system state)
/// and the query layer over the indexer database.
pub struct AppState {
    pub config: Config,
    pub db_pool: PgPool,
    pub queries: Arc<IndexerQueries>,
}
