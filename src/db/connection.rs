// Primary-database bootstrap. INIT_SCHEMA is applied on connect so a fresh
// database is usable immediately. The indexer database is reached lazily
// through indexer::TableDiscovery instead; its schema is never ours to
// manage.

use crate::config::Config;
use crate::db::INIT_SCHEMA;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub async fn establish_primary(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.primary_database_url)
        .await?;

    sqlx::raw_sql(INIT_SCHEMA).execute(&pool).await?;

    Ok(pool)
}
