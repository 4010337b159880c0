// Per-event-type application of raw events onto the domain projections.
// Handlers run inside a per-event savepoint on the pass's transaction;
// each is best-effort idempotent via the natural key noted on it.

use crate::db::{investment, sukuk, yields};
use crate::sync::events::{
    EventKind, InvestmentMadePayload, RawBlockchainEvent, SukukDeployedPayload,
    YieldClaimedPayload, YieldDistributedPayload,
};
use crate::sync::SyncError;
use crate::tokenmath;
use sqlx::PgConnection;
use tracing::{debug, warn};

fn decode<T: serde::de::DeserializeOwned>(event: &RawBlockchainEvent) -> Result<T, SyncError> {
    serde_json::from_value(event.event_data.clone()).map_err(|source| SyncError::Payload {
        event: event.event_name.clone(),
        id: event.id,
        source,
    })
}

/// Applies one event to the projections. An `Err` here is a per-event
/// failure: the caller logs it and moves on, and the cursor still advances
/// past this event.
pub async fn apply_event(
    conn: &mut PgConnection,
    event: &RawBlockchainEvent,
) -> Result<(), SyncError> {
    match EventKind::parse(&event.event_name) {
        EventKind::InvestmentMade => apply_investment(conn, event).await,
        EventKind::YieldDistributed => apply_yield_distribution(conn, event).await,
        EventKind::YieldClaimed => apply_yield_claim(conn, event).await,
        EventKind::SukukDeployed => apply_sukuk_deployed(conn, event).await,
        // Lifecycle transitions not applied yet; logged so the gap is
        // visible in traces rather than a silent fall-through
        EventKind::RedemptionRequested
        | EventKind::RedemptionApproved
        | EventKind::RedemptionRejected
        | EventKind::EmergencySuspension => {
            debug!(
                "No handler wired for '{}' (event id {}); skipping",
                event.event_name, event.id
            );
            Ok(())
        }
        EventKind::Unknown(name) => {
            warn!("Unknown event name '{}' (event id {}); skipping", name, event.id);
            Ok(())
        }
    }
}

/// Idempotency key: (tx_hash, log_index). A replayed event writes nothing.
async fn apply_investment(
    conn: &mut PgConnection,
    event: &RawBlockchainEvent,
) -> Result<(), SyncError> {
    let payload: InvestmentMadePayload = decode(event)?;

    let inserted = investment::insert_if_absent(
        &mut *conn,
        &payload.investor_address,
        &payload.sukuk_address,
        &payload.token_amount,
        &event.tx_hash,
        event.log_index,
        event.block_timestamp,
    )
    .await?;

    if inserted {
        debug!(
            "Recorded investment of {} in {} by {}",
            payload.token_amount, payload.sukuk_address, payload.investor_address
        );
    } else {
        debug!(
            "Duplicate investment event {}:{} ignored",
            event.tx_hash, event.log_index
        );
    }
    Ok(())
}

/// Fans a distribution out across the sukuk's investments pro rata.
/// Idempotency key: (investment_id, distribution_id) per yield row.
async fn apply_yield_distribution(
    conn: &mut PgConnection,
    event: &RawBlockchainEvent,
) -> Result<(), SyncError> {
    let payload: YieldDistributedPayload = decode(event)?;

    let investments = investment::for_sukuk(&mut *conn, &payload.sukuk_address).await?;
    if investments.is_empty() {
        warn!(
            "Distribution {} for {} matches no investments",
            payload.distribution_id, payload.sukuk_address
        );
        return Ok(());
    }

    // A malformed amount fails the whole event; the pass rolls this
    // event's writes back and moves on
    let amounts: Vec<&str> = investments.iter().map(|(_, _, a)| a.as_str()).collect();
    let total_invested = tokenmath::sum(amounts)
        .map_err(|source| SyncError::Amount { id: event.id, source })?;

    for (investment_id, investor_address, token_amount) in &investments {
        let share = tokenmath::mul_div(&payload.total_amount, token_amount, &total_invested)
            .map_err(|source| SyncError::Amount { id: event.id, source })?;
        yields::insert_distribution_entry(
            &mut *conn,
            *investment_id,
            investor_address,
            &payload.sukuk_address,
            payload.distribution_id,
            &share,
        )
        .await?;
    }

    debug!(
        "Distribution {} of {} spread across {} investments",
        payload.distribution_id,
        payload.total_amount,
        investments.len()
    );
    Ok(())
}

/// Marks the investor's pending yields claimed across the claimed
/// distribution-id range. Naturally idempotent: already-claimed rows no
/// longer match the `status = 'pending'` predicate.
async fn apply_yield_claim(
    conn: &mut PgConnection,
    event: &RawBlockchainEvent,
) -> Result<(), SyncError> {
    let payload: YieldClaimedPayload = decode(event)?;

    let updated = yields::mark_claimed_in_range(
        &mut *conn,
        &payload.investor_address,
        &payload.sukuk_address,
        payload.from_distribution_id,
        payload.to_distribution_id,
        event.block_timestamp,
        &event.tx_hash,
    )
    .await?;

    debug!(
        "Claim by {} settled {} pending yields (distributions {}..={})",
        payload.investor_address, updated, payload.from_distribution_id, payload.to_distribution_id
    );
    Ok(())
}

/// Attaches the deployed token address to the draft sukuk of that name.
async fn apply_sukuk_deployed(
    conn: &mut PgConnection,
    event: &RawBlockchainEvent,
) -> Result<(), SyncError> {
    let payload: SukukDeployedPayload = decode(event)?;

    let attached = sukuk::attach_token_address(&mut *conn, &payload.name, &payload.token_address).await?;
    if attached {
        debug!("Sukuk '{}' deployed at {}", payload.name, payload.token_address);
    } else {
        warn!(
            "Deployment event for '{}' matches no draft sukuk (event id {})",
            payload.name, event.id
        );
    }
    Ok(())
}
