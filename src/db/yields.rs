use crate::models::YieldEntry;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Row};

/// Records one investment's share of a distribution. Replayed distribution
/// events hit the (investment_id, distribution_id) unique key and write
/// nothing.
pub async fn insert_distribution_entry<'e>(
    executor: impl PgExecutor<'e>,
    investment_id: i64,
    investor_address: &str,
    sukuk_address: &str,
    distribution_id: i64,
    amount: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO yields
           (investment_id, investor_address, sukuk_address, distribution_id, amount)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (investment_id, distribution_id) DO NOTHING"#,
    )
    .bind(investment_id)
    .bind(investor_address)
    .bind(sukuk_address)
    .bind(distribution_id)
    .bind(amount)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Marks every pending yield of the investor inside the claimed
/// distribution-id range. Returns the number of rows flipped to claimed.
pub async fn mark_claimed_in_range<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
    sukuk_address: &str,
    from_distribution_id: i64,
    to_distribution_id: i64,
    claimed_at: DateTime<Utc>,
    claim_tx_hash: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE yields
           SET status = 'claimed', claimed_at = $5, claim_tx_hash = $6
           WHERE investor_address = $1 AND sukuk_address = $2
             AND distribution_id BETWEEN $3 AND $4
             AND status = 'pending'"#,
    )
    .bind(investor_address)
    .bind(sukuk_address)
    .bind(from_distribution_id)
    .bind(to_distribution_id)
    .bind(claimed_at)
    .bind(claim_tx_hash)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn for_investor<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
) -> Result<Vec<YieldEntry>, sqlx::Error> {
    sqlx::query_as::<_, YieldEntry>(
        r#"SELECT id, investment_id, investor_address, sukuk_address, distribution_id,
                  amount, status, claimed_at, claim_tx_hash, created_at
           FROM yields WHERE investor_address = $1
           ORDER BY distribution_id DESC"#,
    )
    .bind(investor_address)
    .fetch_all(executor)
    .await
}

pub async fn pending_count<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM yields WHERE investor_address = $1 AND status = 'pending'",
    )
    .bind(investor_address)
    .fetch_one(executor)
    .await?;
    Ok(row.get("n"))
}
