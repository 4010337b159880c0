// Typed, filtered reads over whichever indexer table is currently "latest"
// for each event type. Every query resolves (and schema-validates) its
// table first; a resolution failure fails the whole query so callers can
// tell "no data" from "no table". Resolution results sit in a short TTL
// cache; the underlying discovery stays cache-free.

use crate::indexer::discovery::{ensure_safe_identifier, TableDiscovery};
use crate::indexer::error::IndexerError;
use crate::indexer::rows::{
    ActivityEntry, ActivityKind, BalanceSnapshotRow, PortfolioPosition, PurchaseRow,
    RedemptionApprovalRow, RedemptionRequestRow, YieldClaimRow, YieldDistributionRow,
};
use crate::tokenmath;
use moka::future::Cache;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound applied to caller-supplied limits.
pub const MAX_QUERY_LIMIT: i64 = 100;

const RECENT_DISTRIBUTIONS_PER_POSITION: i64 = 5;

/// Filter for per-event-type listings. An empty or missing address means
/// unfiltered; `limit` is optional and clamped to `MAX_QUERY_LIMIT`.
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub address: Option<String>,
    pub sukuk: Option<String>,
    pub limit: Option<i64>,
}

impl EventFilter {
    pub fn by_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    pub fn by_sukuk(sukuk: impl Into<String>) -> Self {
        Self {
            sukuk: Some(sukuk.into()),
            ..Self::default()
        }
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    fn sukuk(&self) -> Option<&str> {
        self.sukuk.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// Only the upper bound is the service's call; a non-positive limit is
// honored as zero (an empty result), not bumped to 1.
fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(0, MAX_QUERY_LIMIT)
}

pub struct IndexerQueries {
    discovery: Arc<TableDiscovery>,
    table_cache: Cache<String, String>,
}

impl IndexerQueries {
    pub fn new(discovery: Arc<TableDiscovery>, cache_ttl: Duration) -> Self {
        Self {
            discovery,
            table_cache: Cache::builder()
                .max_capacity(64)
                .time_to_live(cache_ttl)
                .build(),
        }
    }

    /// Resolves the latest validated table for an event type. Only
    /// successful resolutions are cached, so a missing table keeps being
    /// re-checked and keeps failing loudly.
    async fn resolve(&self, event_type: &str) -> Result<String, IndexerError> {
        if let Some(table) = self.table_cache.get(event_type).await {
            return Ok(table);
        }
        let table = self.discovery.latest_table_for(event_type).await?;
        self.discovery.validate_schema(&table, event_type).await?;
        debug!("Resolved latest table for {}: {}", event_type, table);
        self.table_cache
            .insert(event_type.to_string(), table.clone())
            .await;
        Ok(table)
    }

    /// Shared listing query: resolve table, apply optional address/sukuk
    /// filters and limit, newest first. Identifier is catalog-sourced and
    /// re-checked before interpolation; values are bound.
    async fn fetch_filtered<T>(
        &self,
        event_type: &str,
        columns: &str,
        address_column: &str,
        filter: &EventFilter,
    ) -> Result<Vec<T>, IndexerError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let table = self.resolve(event_type).await?;
        ensure_safe_identifier(&table)?;

        let mut sql = format!(r#"SELECT {} FROM "{}""#, columns, table);
        let mut conditions = Vec::new();
        let mut next_bind = 1;

        let address = filter.address();
        if address.is_some() {
            conditions.push(format!("{} = ${}", address_column, next_bind));
            next_bind += 1;
        }
        let sukuk = filter.sukuk();
        if sukuk.is_some() {
            conditions.push(format!("sukuk_address = ${}", next_bind));
            next_bind += 1;
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY block_timestamp DESC");
        if filter.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", next_bind));
        }

        let mut query = sqlx::query_as::<_, T>(&sql);
        if let Some(address) = address {
            query = query.bind(address.to_string());
        }
        if let Some(sukuk) = sukuk {
            query = query.bind(sukuk.to_string());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(clamp_limit(limit));
        }

        let pool = self.discovery.connect().await?;
        Ok(query.fetch_all(pool).await?)
    }

    pub async fn purchases(&self, filter: &EventFilter) -> Result<Vec<PurchaseRow>, IndexerError> {
        self.fetch_filtered(
            "sukuk_purchase",
            "buyer_address, sukuk_address, token_amount, payment_amount, tx_hash, block_timestamp",
            "buyer_address",
            filter,
        )
        .await
    }

    pub async fn redemption_requests(
        &self,
        filter: &EventFilter,
    ) -> Result<Vec<RedemptionRequestRow>, IndexerError> {
        self.fetch_filtered(
            "redemption_request",
            "investor_address, sukuk_address, token_amount, tx_hash, block_timestamp",
            "investor_address",
            filter,
        )
        .await
    }

    pub async fn redemption_approvals(
        &self,
        filter: &EventFilter,
    ) -> Result<Vec<RedemptionApprovalRow>, IndexerError> {
        self.fetch_filtered(
            "redemption_approval",
            "investor_address, sukuk_address, approved_amount, tx_hash, block_timestamp",
            "investor_address",
            filter,
        )
        .await
    }

    pub async fn yield_claims(
        &self,
        filter: &EventFilter,
    ) -> Result<Vec<YieldClaimRow>, IndexerError> {
        self.fetch_filtered(
            "yield_claim",
            "investor_address, sukuk_address, claimed_amount, from_distribution_id, \
             to_distribution_id, tx_hash, block_timestamp",
            "investor_address",
            filter,
        )
        .await
    }

    /// Current balance of a holder in a sukuk: the newest snapshot row, or
    /// "0" when the holder has none. Absence of rows is not an error.
    pub async fn balance_of(&self, holder: &str, sukuk: &str) -> Result<String, IndexerError> {
        let table = self.resolve("balance_snapshot").await?;
        ensure_safe_identifier(&table)?;
        let pool = self.discovery.connect().await?;

        let row = sqlx::query(&format!(
            r#"SELECT balance FROM "{}"
               WHERE holder_address = $1 AND sukuk_address = $2
               ORDER BY block_number DESC LIMIT 1"#,
            table
        ))
        .bind(holder)
        .bind(sukuk)
        .fetch_optional(pool)
        .await?;

        Ok(row
            .map(|r| r.get::<String, _>("balance"))
            .unwrap_or_else(|| "0".to_string()))
    }

    /// Total outstanding balance of a sukuk: the newest snapshot per holder,
    /// summed exactly.
    async fn total_supply(&self, sukuk: &str) -> Result<String, IndexerError> {
        let table = self.resolve("balance_snapshot").await?;
        ensure_safe_identifier(&table)?;
        let pool = self.discovery.connect().await?;

        let rows = sqlx::query(&format!(
            r#"SELECT DISTINCT ON (holder_address) balance FROM "{}"
               WHERE sukuk_address = $1
               ORDER BY holder_address, block_number DESC"#,
            table
        ))
        .bind(sukuk)
        .fetch_all(pool)
        .await?;

        let balances: Vec<String> = rows.iter().map(|r| r.get("balance")).collect();
        // A malformed balance string in the indexer degrades to zero supply
        // rather than failing the read path
        Ok(tokenmath::sum(balances.iter().map(String::as_str))
            .unwrap_or_else(|_| "0".to_string()))
    }

    /// Yield currently claimable by a holder: their pro-rata share of every
    /// distribution newer than their last claim. All arithmetic is exact;
    /// a holder with no balance (or a sukuk with no distributions) gets "0".
    pub async fn claimable_yield(&self, holder: &str, sukuk: &str) -> Result<String, IndexerError> {
        let balance = self.balance_of(holder, sukuk).await?;
        if tokenmath::is_zero(&balance).unwrap_or(true) {
            return Ok("0".to_string());
        }
        let supply = self.total_supply(sukuk).await?;

        let last_claimed = self.last_claimed_distribution(holder, sukuk).await?;
        let distributions = self
            .distributions_after(sukuk, last_claimed)
            .await?;

        let mut claimable = "0".to_string();
        for distribution in &distributions {
            let share = tokenmath::mul_div(&distribution.total_amount, &balance, &supply)
                .unwrap_or_else(|_| "0".to_string());
            claimable = tokenmath::add(&claimable, &share)
                .unwrap_or(claimable);
        }
        Ok(claimable)
    }

    async fn last_claimed_distribution(
        &self,
        holder: &str,
        sukuk: &str,
    ) -> Result<i64, IndexerError> {
        let table = self.resolve("yield_claim").await?;
        ensure_safe_identifier(&table)?;
        let pool = self.discovery.connect().await?;

        let row = sqlx::query(&format!(
            r#"SELECT MAX(to_distribution_id) AS last_claimed FROM "{}"
               WHERE investor_address = $1 AND sukuk_address = $2"#,
            table
        ))
        .bind(holder)
        .bind(sukuk)
        .fetch_one(pool)
        .await?;

        Ok(row.get::<Option<i64>, _>("last_claimed").unwrap_or(0))
    }

    async fn distributions_after(
        &self,
        sukuk: &str,
        after_distribution_id: i64,
    ) -> Result<Vec<YieldDistributionRow>, IndexerError> {
        let table = self.resolve("yield_distribution").await?;
        ensure_safe_identifier(&table)?;
        let pool = self.discovery.connect().await?;

        Ok(sqlx::query_as::<_, YieldDistributionRow>(&format!(
            r#"SELECT sukuk_address, distribution_id, total_amount, tx_hash, block_timestamp
               FROM "{}"
               WHERE sukuk_address = $1 AND distribution_id > $2
               ORDER BY distribution_id ASC"#,
            table
        ))
        .bind(sukuk)
        .bind(after_distribution_id)
        .fetch_all(pool)
        .await?)
    }

    /// Distributions of a sukuk, newest first, clamped limit.
    pub async fn yield_distributions(
        &self,
        sukuk: &str,
        limit: i64,
    ) -> Result<Vec<YieldDistributionRow>, IndexerError> {
        let table = self.resolve("yield_distribution").await?;
        ensure_safe_identifier(&table)?;
        let pool = self.discovery.connect().await?;

        Ok(sqlx::query_as::<_, YieldDistributionRow>(&format!(
            r#"SELECT sukuk_address, distribution_id, total_amount, tx_hash, block_timestamp
               FROM "{}"
               WHERE sukuk_address = $1
               ORDER BY distribution_id DESC LIMIT $2"#,
            table
        ))
        .bind(sukuk)
        .bind(clamp_limit(limit))
        .fetch_all(pool)
        .await?)
    }

    /// Balance snapshots of a sukuk, newest first, clamped limit.
    pub async fn balance_snapshots(
        &self,
        sukuk: &str,
        limit: i64,
    ) -> Result<Vec<BalanceSnapshotRow>, IndexerError> {
        let table = self.resolve("balance_snapshot").await?;
        ensure_safe_identifier(&table)?;
        let pool = self.discovery.connect().await?;

        Ok(sqlx::query_as::<_, BalanceSnapshotRow>(&format!(
            r#"SELECT holder_address, sukuk_address, balance, block_number, block_timestamp
               FROM "{}"
               WHERE sukuk_address = $1
               ORDER BY block_number DESC LIMIT $2"#,
            table
        ))
        .bind(sukuk)
        .bind(clamp_limit(limit))
        .fetch_all(pool)
        .await?)
    }

    /// Full portfolio of an address: every sukuk it ever bought or held,
    /// with current balance, claimable yield and recent distributions.
    pub async fn portfolio(&self, address: &str) -> Result<Vec<PortfolioPosition>, IndexerError> {
        let mut sukuks: BTreeSet<String> = BTreeSet::new();

        let purchases = self.purchases(&EventFilter::by_address(address)).await?;
        sukuks.extend(purchases.into_iter().map(|p| p.sukuk_address));

        let snapshot_table = self.resolve("balance_snapshot").await?;
        ensure_safe_identifier(&snapshot_table)?;
        let pool = self.discovery.connect().await?;
        let rows = sqlx::query(&format!(
            r#"SELECT DISTINCT sukuk_address FROM "{}" WHERE holder_address = $1"#,
            snapshot_table
        ))
        .bind(address)
        .fetch_all(pool)
        .await?;
        sukuks.extend(rows.iter().map(|r| r.get::<String, _>("sukuk_address")));

        let mut positions = Vec::with_capacity(sukuks.len());
        for sukuk in sukuks {
            let balance = self.balance_of(address, &sukuk).await?;
            let claimable_yield = self.claimable_yield(address, &sukuk).await?;
            let recent_distributions = self
                .yield_distributions(&sukuk, RECENT_DISTRIBUTIONS_PER_POSITION)
                .await?;
            positions.push(PortfolioPosition {
                sukuk_address: sukuk,
                balance,
                claimable_yield,
                recent_distributions,
            });
        }
        Ok(positions)
    }

    /// Combined activity feed for an address: purchases, redemption
    /// requests and yield claims merged newest-first, bounded by limit.
    pub async fn transaction_history(
        &self,
        address: &str,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, IndexerError> {
        let limit = clamp_limit(limit);
        let filter = EventFilter {
            address: Some(address.to_string()),
            sukuk: None,
            limit: Some(limit),
        };

        let (purchases, requests, claims) = futures::future::try_join3(
            self.purchases(&filter),
            self.redemption_requests(&filter),
            self.yield_claims(&filter),
        )
        .await?;

        let mut entries: Vec<ActivityEntry> = Vec::new();
        entries.extend(purchases.into_iter().map(|p| ActivityEntry {
            kind: ActivityKind::Purchase,
            sukuk_address: p.sukuk_address,
            amount: p.token_amount,
            tx_hash: p.tx_hash,
            block_timestamp: p.block_timestamp,
        }));
        entries.extend(requests.into_iter().map(|r| ActivityEntry {
            kind: ActivityKind::RedemptionRequest,
            sukuk_address: r.sukuk_address,
            amount: r.token_amount,
            tx_hash: r.tx_hash,
            block_timestamp: r.block_timestamp,
        }));
        entries.extend(claims.into_iter().map(|c| ActivityEntry {
            kind: ActivityKind::YieldClaim,
            sukuk_address: c.sukuk_address,
            amount: c.claimed_amount,
            tx_hash: c.tx_hash,
            block_timestamp: c.block_timestamp,
        }));

        entries.sort_by(|a, b| b.block_timestamp.cmp(&a.block_timestamp));
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_treats_blank_address_as_unfiltered() {
        let blank = EventFilter {
            address: Some("   ".to_string()),
            sukuk: Some(String::new()),
            limit: None,
        };
        assert_eq!(blank.address(), None);
        assert_eq!(blank.sukuk(), None);

        let set = EventFilter::by_address("0xabc");
        assert_eq!(set.address(), Some("0xabc"));
    }

    #[test]
    fn limits_are_clamped_to_service_maximum() {
        assert_eq!(clamp_limit(10), 10);
        assert_eq!(clamp_limit(10_000), MAX_QUERY_LIMIT);
    }

    #[test]
    fn non_positive_limits_mean_empty_not_one() {
        assert_eq!(clamp_limit(0), 0);
        assert_eq!(clamp_limit(-5), 0);
    }
}
