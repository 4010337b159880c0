use crate::models::Investment;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Row};

/// Inserts an investment unless one with the same (tx_hash, log_index)
/// already exists. Returns true when a row was actually written; replayed
/// events come back false and are counted as deduplicated by the caller.
pub async fn insert_if_absent<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
    sukuk_address: &str,
    token_amount: &str,
    tx_hash: &str,
    log_index: i64,
    block_timestamp: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO investments
           (investor_address, sukuk_address, token_amount, tx_hash, log_index, block_timestamp)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (tx_hash, log_index) DO NOTHING"#,
    )
    .bind(investor_address)
    .bind(sukuk_address)
    .bind(token_amount)
    .bind(tx_hash)
    .bind(log_index)
    .bind(block_timestamp)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Investments of a sukuk, as (id, investor_address, token_amount) tuples.
/// The yield-distribution handler fans a distribution out across these.
pub async fn for_sukuk<'e>(
    executor: impl PgExecutor<'e>,
    sukuk_address: &str,
) -> Result<Vec<(i64, String, String)>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, investor_address, token_amount
           FROM investments WHERE sukuk_address = $1 ORDER BY id ASC"#,
    )
    .bind(sukuk_address)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .iter()
        .map(|r| (r.get("id"), r.get("investor_address"), r.get("token_amount")))
        .collect())
}

pub async fn for_investor<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
) -> Result<Vec<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        r#"SELECT id, investor_address, sukuk_address, token_amount, tx_hash,
                  log_index, block_timestamp, created_at
           FROM investments WHERE investor_address = $1
           ORDER BY block_timestamp DESC"#,
    )
    .bind(investor_address)
    .fetch_all(executor)
    .await
}

pub async fn count<'e>(executor: impl PgExecutor<'e>) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM investments")
        .fetch_one(executor)
        .await?;
    Ok(row.get("n"))
}
