pub mod config;
pub mod db;
pub mod indexer;
pub mod models;
pub mod redemption;
pub mod state;
pub mod sync;
pub mod tokenmath;

#[cfg(test)]
pub mod tests;

// Re-export the surface the API layer consumes
pub use indexer::{DiscoveredTable, EventFilter, IndexerError, IndexerQueries, TableDiscovery};
pub use redemption::{RedemptionMergeService, RedemptionStatus, RedemptionSummary, RedemptionView};
pub use state::AppState;
pub use sync::{run_sync_pass, start_sync, SyncPassOutcome};
