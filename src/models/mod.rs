// Domain projections owned by this service. These rows are written by the
// event sync loop (and admin paths outside this core) and read by the API
// layer; all token amounts are decimal strings, never floats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sukuk {
    pub id: i64,
    pub name: String,
    /// On-chain token address, attached once the deployment event arrives.
    pub token_address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sukuk {
    pub const STATUS_DRAFT: &'static str = "draft";
    pub const STATUS_DEPLOYED: &'static str = "deployed";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Investment {
    pub id: i64,
    pub investor_address: String,
    pub sukuk_address: String,
    /// Wei-scale token amount as a decimal string.
    pub token_amount: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub block_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct YieldEntry {
    pub id: i64,
    pub investment_id: i64,
    pub investor_address: String,
    pub sukuk_address: String,
    pub distribution_id: i64,
    pub amount: String,
    pub status: String,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claim_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl YieldEntry {
    pub const STATUS_PENDING: &'static str = "pending";
    pub const STATUS_CLAIMED: &'static str = "claimed";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Redemption {
    pub id: i64,
    pub investor_address: String,
    pub sukuk_address: String,
    pub token_amount: String,
    pub status: String,
    pub tx_hash: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Redemption {
    pub const STATUS_REQUESTED: &'static str = "requested";
}
