// Discovery of the indexer's hash-prefixed event tables.
//
// Every contract redeployment makes the indexer re-create its event tables
// under a fresh hash prefix (`f243__sukuk_purchase`, `a1b2__sukuk_purchase`,
// ...), so table names can never be hardcoded. This module enumerates the
// catalog, resolves the latest table per event type, and validates column
// layouts before anything trusts a query against them.

use crate::indexer::error::IndexerError;
use backon::{ExponentialBuilder, Retryable};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTable {
    pub event_type: String,
    pub hash_prefix: String,
    pub full_table_name: String,
}

/// Expected column sets per known event type. A discovered table is not
/// trusted until its columns cover the set registered here.
pub fn expected_columns(event_type: &str) -> Option<&'static [&'static str]> {
    match event_type {
        "sukuk_purchase" => Some(&[
            "buyer_address",
            "sukuk_address",
            "token_amount",
            "payment_amount",
            "tx_hash",
            "block_timestamp",
        ]),
        "redemption_request" => Some(&[
            "investor_address",
            "sukuk_address",
            "token_amount",
            "tx_hash",
            "block_timestamp",
        ]),
        "redemption_approval" => Some(&[
            "investor_address",
            "sukuk_address",
            "approved_amount",
            "tx_hash",
            "block_timestamp",
        ]),
        "yield_distribution" => Some(&[
            "sukuk_address",
            "distribution_id",
            "total_amount",
            "tx_hash",
            "block_timestamp",
        ]),
        "balance_snapshot" => Some(&[
            "holder_address",
            "sukuk_address",
            "balance",
            "block_number",
            "block_timestamp",
        ]),
        "yield_claim" => Some(&[
            "investor_address",
            "sukuk_address",
            "claimed_amount",
            "from_distribution_id",
            "to_distribution_id",
            "tx_hash",
            "block_timestamp",
        ]),
        _ => None,
    }
}

/// Splits `<hashPrefix>__<eventType>` into its parts. The prefix must be
/// non-empty lowercase hex; anything else is not an event table.
pub fn parse_table_name(name: &str) -> Option<(String, String)> {
    let (prefix, event_type) = name.split_once("__")?;
    if prefix.is_empty() || event_type.is_empty() {
        return None;
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        return None;
    }
    Some((prefix.to_string(), event_type.to_string()))
}

/// Latest-table selection rule: the lexicographically greatest hash prefix
/// wins, full table name as tie-break. Deterministic for any input set and
/// independent of catalog enumeration order.
pub fn select_latest<'a>(tables: &'a [DiscoveredTable]) -> Option<&'a DiscoveredTable> {
    tables
        .iter()
        .max_by(|a, b| {
            a.hash_prefix
                .cmp(&b.hash_prefix)
                .then_with(|| a.full_table_name.cmp(&b.full_table_name))
        })
}

/// Lazily-connected handle to the indexer database.
pub struct TableDiscovery {
    url: String,
    pool: OnceCell<PgPool>,
}

impl TableDiscovery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: OnceCell::new(),
        }
    }

    /// Builds a discovery handle over an already-connected pool.
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            url: String::new(),
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    /// Lazily establishes the indexer connection. Idempotent: concurrent and
    /// repeated calls share one pool.
    pub async fn connect(&self) -> Result<&PgPool, IndexerError> {
        self.pool
            .get_or_try_init(|| async {
                let url = self.url.clone();
                let attempt = || async {
                    PgPoolOptions::new()
                        .max_connections(5)
                        .acquire_timeout(Duration::from_secs(10))
                        .connect(&url)
                        .await
                };
                attempt
                    .retry(ExponentialBuilder::default().with_max_times(3))
                    .notify(|err: &sqlx::Error, dur: Duration| {
                        warn!("Indexer connection attempt failed (retrying in {:?}): {}", dur, err);
                    })
                    .await
                    .map_err(|e| IndexerError::Connection(e.to_string()))
            })
            .await
    }

    /// Enumerates every event table currently in the indexer's catalog.
    /// No caching: each call reflects the catalog as of now.
    pub async fn discover_all_tables(&self) -> Result<Vec<DiscoveredTable>, IndexerError> {
        let pool = self.connect().await?;
        let rows = sqlx::query(
            r#"SELECT table_name FROM information_schema.tables
               WHERE table_schema = 'public' AND table_type = 'BASE TABLE'"#,
        )
        .fetch_all(pool)
        .await?;

        let tables = rows
            .iter()
            .filter_map(|row| {
                let name: String = row.get("table_name");
                let (hash_prefix, event_type) = parse_table_name(&name)?;
                Some(DiscoveredTable {
                    event_type,
                    hash_prefix,
                    full_table_name: name,
                })
            })
            .collect::<Vec<_>>();

        debug!("Discovered {} indexer event tables", tables.len());
        Ok(tables)
    }

    /// Resolves the single current table for an event type, or
    /// `NoTableForEvent` when no deployment has one.
    pub async fn latest_table_for(&self, event_type: &str) -> Result<String, IndexerError> {
        let tables = self.discover_all_tables().await?;
        let candidates: Vec<DiscoveredTable> = tables
            .into_iter()
            .filter(|t| t.event_type == event_type)
            .collect();

        select_latest(&candidates)
            .map(|t| t.full_table_name.clone())
            .ok_or_else(|| IndexerError::NoTableForEvent(event_type.to_string()))
    }

    /// One-pass eventType -> latest table map for every discovered type.
    pub async fn all_latest_tables(&self) -> Result<HashMap<String, String>, IndexerError> {
        let tables = self.discover_all_tables().await?;

        let mut by_type: HashMap<String, Vec<DiscoveredTable>> = HashMap::new();
        for table in tables {
            by_type.entry(table.event_type.clone()).or_default().push(table);
        }

        Ok(by_type
            .into_iter()
            .filter_map(|(event_type, group)| {
                select_latest(&group).map(|t| (event_type, t.full_table_name.clone()))
            })
            .collect())
    }

    pub async fn available_event_types(&self) -> Result<Vec<String>, IndexerError> {
        let tables = self.discover_all_tables().await?;
        let mut types: Vec<String> = tables.into_iter().map(|t| t.event_type).collect();
        types.sort();
        types.dedup();
        Ok(types)
    }

    /// Confirms the table carries the column set registered for the event
    /// type. Must run before any query that assumes specific columns.
    pub async fn validate_schema(
        &self,
        table_name: &str,
        event_type: &str,
    ) -> Result<(), IndexerError> {
        let expected = expected_columns(event_type)
            .ok_or_else(|| IndexerError::UnknownEventType(event_type.to_string()))?;

        let pool = self.connect().await?;
        let rows = sqlx::query(
            r#"SELECT column_name FROM information_schema.columns
               WHERE table_schema = 'public' AND table_name = $1"#,
        )
        .bind(table_name)
        .fetch_all(pool)
        .await?;

        let actual: Vec<String> = rows.iter().map(|r| r.get("column_name")).collect();
        let missing: Vec<String> = expected
            .iter()
            .filter(|col| !actual.iter().any(|a| a == *col))
            .map(|col| col.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(IndexerError::SchemaMismatch {
                table: table_name.to_string(),
                missing,
            })
        }
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, IndexerError> {
        let pool = self.connect().await?;
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM information_schema.tables
               WHERE table_schema = 'public' AND table_name = $1"#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    pub async fn row_count(&self, table_name: &str) -> Result<i64, IndexerError> {
        ensure_safe_identifier(table_name)?;
        let pool = self.connect().await?;
        let row = sqlx::query(&format!(r#"SELECT COUNT(*) AS n FROM "{}""#, table_name))
            .fetch_one(pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn tables_with_hash_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<DiscoveredTable>, IndexerError> {
        let tables = self.discover_all_tables().await?;
        Ok(tables
            .into_iter()
            .filter(|t| t.hash_prefix == prefix)
            .collect())
    }
}

/// Table names are interpolated into SQL (identifiers cannot be bound), so
/// only names made of lowercase alphanumerics and underscores are accepted.
/// Discovered names always satisfy this; anything else is rejected.
pub fn ensure_safe_identifier(name: &str) -> Result<(), IndexerError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(IndexerError::UnsafeIdentifier(name.to_string()))
    }
}
