// Generic key/value system-state store. The sync cursor lives here under a
// fixed key; operational tooling uses the same table under its own keys.

use sqlx::{PgExecutor, Row};

pub const SYNC_CURSOR_KEY: &str = "last_processed_event_id";

pub async fn get<'e>(
    executor: impl PgExecutor<'e>,
    key: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query("SELECT value FROM system_state WHERE key = $1")
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|r| r.get("value")))
}

pub async fn set<'e>(
    executor: impl PgExecutor<'e>,
    key: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO system_state (key, value, updated_at)
           VALUES ($1, $2, now())
           ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()"#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}

/// Reads the persisted sync cursor. Absent or unparsable values fall back
/// to 0, which makes the next pass start from the beginning of the log.
pub async fn get_cursor<'e>(executor: impl PgExecutor<'e>) -> Result<i64, sqlx::Error> {
    let value = get(executor, SYNC_CURSOR_KEY).await?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Persists the cursor. Written inside the same transaction as the pass's
/// projection writes so cursor and projections commit atomically.
pub async fn set_cursor<'e>(
    executor: impl PgExecutor<'e>,
    event_id: i64,
) -> Result<(), sqlx::Error> {
    set(executor, SYNC_CURSOR_KEY, &event_id.to_string()).await
}
