// Typed rows for the indexer's event tables, one struct per event type.
// Tables are resolved at runtime, so decoding goes through FromRow against
// the validated column names rather than compile-time checked queries.
// Token amounts stay decimal strings end to end.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseRow {
    pub buyer_address: String,
    pub sukuk_address: String,
    pub token_amount: String,
    pub payment_amount: String,
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RedemptionRequestRow {
    pub investor_address: String,
    pub sukuk_address: String,
    pub token_amount: String,
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RedemptionApprovalRow {
    pub investor_address: String,
    pub sukuk_address: String,
    pub approved_amount: String,
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct YieldDistributionRow {
    pub sukuk_address: String,
    pub distribution_id: i64,
    pub total_amount: String,
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BalanceSnapshotRow {
    pub holder_address: String,
    pub sukuk_address: String,
    pub balance: String,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct YieldClaimRow {
    pub investor_address: String,
    pub sukuk_address: String,
    pub claimed_amount: String,
    pub from_distribution_id: i64,
    pub to_distribution_id: i64,
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
}

/// One sukuk position inside a portfolio: current balance plus the yield
/// currently claimable and recent distribution history for context.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioPosition {
    pub sukuk_address: String,
    pub balance: String,
    pub claimable_yield: String,
    pub recent_distributions: Vec<YieldDistributionRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Purchase,
    RedemptionRequest,
    YieldClaim,
}

/// One entry of the merged cross-event transaction history.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub sukuk_address: String,
    pub amount: String,
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
}
