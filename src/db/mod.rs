pub mod connection;
pub mod investment;
pub mod redemption;
pub mod sukuk;
pub mod system_state;
pub mod yields;

/// Schema for the primary database: domain projections, the unified event
/// log read by the sync loop, and the generic system-state store.
pub const INIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS system_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS sukuks (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    token_address TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS investments (
    id BIGSERIAL PRIMARY KEY,
    investor_address TEXT NOT NULL,
    sukuk_address TEXT NOT NULL,
    token_amount TEXT NOT NULL,
    tx_hash TEXT NOT NULL,
    log_index BIGINT NOT NULL,
    block_timestamp TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tx_hash, log_index)
);

CREATE TABLE IF NOT EXISTS yields (
    id BIGSERIAL PRIMARY KEY,
    investment_id BIGINT NOT NULL REFERENCES investments(id),
    investor_address TEXT NOT NULL,
    sukuk_address TEXT NOT NULL,
    distribution_id BIGINT NOT NULL,
    amount TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    claimed_at TIMESTAMPTZ,
    claim_tx_hash TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (investment_id, distribution_id)
);

CREATE TABLE IF NOT EXISTS redemptions (
    id BIGSERIAL PRIMARY KEY,
    investor_address TEXT NOT NULL,
    sukuk_address TEXT NOT NULL,
    token_amount TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'requested',
    tx_hash TEXT,
    requested_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE SCHEMA IF NOT EXISTS blockchain;

CREATE TABLE IF NOT EXISTS blockchain.events (
    id BIGSERIAL PRIMARY KEY,
    event_name TEXT NOT NULL,
    tx_hash TEXT NOT NULL,
    log_index BIGINT NOT NULL,
    block_number BIGINT NOT NULL,
    block_timestamp TIMESTAMPTZ NOT NULL,
    contract_address TEXT NOT NULL,
    event_data JSONB NOT NULL,
    chain_id BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_investments_investor ON investments(investor_address);
CREATE INDEX IF NOT EXISTS idx_investments_sukuk ON investments(sukuk_address);
CREATE INDEX IF NOT EXISTS idx_yields_investor_distribution ON yields(investor_address, distribution_id);
CREATE INDEX IF NOT EXISTS idx_redemptions_investor ON redemptions(investor_address);
"#;
