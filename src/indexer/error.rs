use thiserror::Error;

/// Failure taxonomy for discovery and queries against the indexer database.
/// "No table" is distinct from "empty result set": queries propagate
/// `NoTableForEvent` instead of returning nothing, so callers can tell
/// missing data from a missing deployment.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Indexer database unreachable: {0}")]
    Connection(String),

    #[error("No indexer table found for event type '{0}'")]
    NoTableForEvent(String),

    #[error("Unknown event type '{0}': no expected column set registered")]
    UnknownEventType(String),

    #[error("Table '{table}' is missing expected columns: {missing:?}")]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("Unsafe table identifier '{0}'")]
    UnsafeIdentifier(String),

    #[error("Indexer query failed: {0}")]
    Database(#[from] sqlx::Error),
}
