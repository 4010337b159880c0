// Redemption projection reads and the admin-path insert. The sync loop's
// redemption lifecycle handlers are currently no-ops (see sync::handlers),
// so rows here originate from admin tooling outside this core.

use crate::models::Redemption;
use sqlx::PgExecutor;

pub async fn insert_requested<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
    sukuk_address: &str,
    token_amount: &str,
    tx_hash: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO redemptions (investor_address, sukuk_address, token_amount, tx_hash)
           VALUES ($1, $2, $3, $4)"#,
    )
    .bind(investor_address)
    .bind(sukuk_address)
    .bind(token_amount)
    .bind(tx_hash)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn for_investor<'e>(
    executor: impl PgExecutor<'e>,
    investor_address: &str,
) -> Result<Vec<Redemption>, sqlx::Error> {
    sqlx::query_as::<_, Redemption>(
        r#"SELECT id, investor_address, sukuk_address, token_amount, status,
                  tx_hash, requested_at, updated_at
           FROM redemptions WHERE investor_address = $1
           ORDER BY requested_at DESC"#,
    )
    .bind(investor_address)
    .fetch_all(executor)
    .await
}
