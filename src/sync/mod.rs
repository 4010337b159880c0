pub mod events;
pub mod handlers;
pub mod polling;

use thiserror::Error;

pub use events::{EventKind, RawBlockchainEvent};
pub use polling::{run_sync_pass, start_sync, SyncPassOutcome};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error during sync: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed payload for event '{event}' (id {id}): {source}")]
    Payload {
        event: String,
        id: i64,
        source: serde_json::Error,
    },

    #[error("Bad token amount while applying event id {id}: {source}")]
    Amount {
        id: i64,
        source: crate::tokenmath::TokenMathError,
    },
}
