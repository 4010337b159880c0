// The event sync loop: the only long-lived background task. Ticks on a
// fixed interval, runs one pass per tick, and stops when the cancellation
// token fires. The pass is awaited inside the tick arm, so a slow pass can
// never overlap the next one; MissedTickBehavior::Delay keeps a backlog of
// missed ticks from firing in a burst afterwards.

use crate::db::system_state;
use crate::state::AppState;
use crate::sync::events::RawBlockchainEvent;
use crate::sync::{handlers, SyncError};
use sqlx::{Acquire, PgPool};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Result of one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncPassOutcome {
    /// Events applied successfully.
    pub applied: usize,
    /// Events that failed and were skipped; the cursor advanced past them.
    pub failed: usize,
    /// New cursor value, when the pass saw any events.
    pub cursor: Option<i64>,
}

pub async fn start_sync(state: Arc<AppState>, shutdown: CancellationToken) {
    info!(
        "Starting event sync loop (interval {:?}, batch size {})",
        state.config.sync_interval, state.config.sync_batch_size
    );

    let mut ticker = interval(state.config.sync_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_sync_pass(&state.db_pool, state.config.sync_batch_size).await {
                    Ok(outcome) => {
                        if outcome.applied > 0 || outcome.failed > 0 {
                            info!(
                                "Sync pass applied {} events ({} failed), cursor now {:?}",
                                outcome.applied, outcome.failed, outcome.cursor
                            );
                        }
                    }
                    // Whole-pass failure: nothing committed, cursor
                    // untouched, retried on the next tick
                    Err(e) => error!("Sync pass failed: {}", e),
                }
            }
            _ = shutdown.cancelled() => {
                info!("Shutting down event sync loop");
                break;
            }
        }
    }
}

/// One cursor-driven pass over the unified event log.
///
/// Reads up to `batch_size` events with `id > cursor` in id order and
/// applies them inside a single transaction on the primary database. Each
/// event runs under its own savepoint: a failed event rolls back exactly
/// its own writes, is logged and skipped, and the cursor is still advanced
/// to the last attempted id, so the pass is at-least-once, not
/// exactly-once. Zero new events means no transaction and no writes at all.
pub async fn run_sync_pass(pool: &PgPool, batch_size: i64) -> Result<SyncPassOutcome, SyncError> {
    let cursor = system_state::get_cursor(pool).await?;

    let events = sqlx::query_as::<_, RawBlockchainEvent>(
        r#"SELECT id, event_name, tx_hash, log_index, block_number, block_timestamp,
                  contract_address, event_data, chain_id
           FROM blockchain.events
           WHERE id > $1
           ORDER BY id ASC
           LIMIT $2"#,
    )
    .bind(cursor)
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    if events.is_empty() {
        debug!("No new events past cursor {}", cursor);
        return Ok(SyncPassOutcome::default());
    }

    let mut tx = pool.begin().await?;
    let mut outcome = SyncPassOutcome::default();

    for event in &events {
        // Savepoint per event: a handler that fails mid-way (e.g. during a
        // multi-row fan-out) must not leave partial writes in the pass
        let mut event_tx = tx.begin().await?;
        match handlers::apply_event(&mut event_tx, event).await {
            Ok(()) => {
                event_tx.commit().await?;
                outcome.applied += 1;
            }
            Err(e) => {
                // Documented data-loss risk: the event is skipped and the
                // cursor moves past it regardless
                event_tx.rollback().await?;
                error!(
                    "Failed to apply event {} ('{}'): {}",
                    event.id, event.event_name, e
                );
                outcome.failed += 1;
            }
        }
    }

    // Last attempted id, success or failure; committed atomically with the
    // pass's projection writes
    let last_id = events.last().map(|e| e.id).unwrap_or(cursor);
    system_state::set_cursor(&mut *tx, last_id).await?;
    tx.commit().await?;

    outcome.cursor = Some(last_id);
    Ok(outcome)
}
