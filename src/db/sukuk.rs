use crate::models::Sukuk;
use sqlx::PgExecutor;

/// Attaches the on-chain token address to a draft sukuk located by name and
/// moves it to deployed. Returns false when no draft with that name exists
/// (the deployment event then has nothing to attach to).
pub async fn attach_token_address<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
    token_address: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE sukuks
           SET token_address = $2, status = 'deployed', updated_at = now()
           WHERE id = (
               SELECT id FROM sukuks
               WHERE name = $1 AND status = 'draft'
               ORDER BY id ASC
               LIMIT 1
           )"#,
    )
    .bind(name)
    .bind(token_address)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Admin paths create drafts before deployment; exposed here so tests and
/// tooling share one insert.
pub async fn create_draft<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sukuks (name, status) VALUES ($1, 'draft')")
        .bind(name)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn by_name<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
) -> Result<Option<Sukuk>, sqlx::Error> {
    sqlx::query_as::<_, Sukuk>(
        r#"SELECT id, name, token_address, status, created_at, updated_at
           FROM sukuks WHERE name = $1 ORDER BY id ASC LIMIT 1"#,
    )
    .bind(name)
    .fetch_optional(executor)
    .await
}
