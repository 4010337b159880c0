// Rows of the unified event log and the typed payloads carried in their
// event_data column. Payload decoding is strict: unknown or missing fields
// are rejected so a contract upgrade that changes a payload shape surfaces
// as a per-event error instead of silently defaulted data.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One row of `blockchain.events`, ordered by `id`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawBlockchainEvent {
    pub id: i64,
    pub event_name: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub contract_address: String,
    pub event_data: serde_json::Value,
    pub chain_id: i64,
}

/// Dispatch key parsed from `event_name`. The redemption lifecycle and
/// emergency-suspension variants are recognized but currently applied as
/// no-ops (see sync::handlers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    InvestmentMade,
    YieldDistributed,
    YieldClaimed,
    SukukDeployed,
    RedemptionRequested,
    RedemptionApproved,
    RedemptionRejected,
    EmergencySuspension,
    Unknown(String),
}

impl EventKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "InvestmentMade" => Self::InvestmentMade,
            "YieldDistributed" => Self::YieldDistributed,
            "YieldClaimed" => Self::YieldClaimed,
            "SukukDeployed" => Self::SukukDeployed,
            "RedemptionRequested" => Self::RedemptionRequested,
            "RedemptionApproved" => Self::RedemptionApproved,
            "RedemptionRejected" => Self::RedemptionRejected,
            "EmergencySuspension" => Self::EmergencySuspension,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct InvestmentMadePayload {
    pub investor_address: String,
    pub sukuk_address: String,
    pub token_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct YieldDistributedPayload {
    pub sukuk_address: String,
    pub distribution_id: i64,
    pub total_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct YieldClaimedPayload {
    pub investor_address: String,
    pub sukuk_address: String,
    pub from_distribution_id: i64,
    pub to_distribution_id: i64,
    pub claimed_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SukukDeployedPayload {
    pub name: String,
    pub token_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_event_names() {
        assert_eq!(EventKind::parse("InvestmentMade"), EventKind::InvestmentMade);
        assert_eq!(EventKind::parse("YieldClaimed"), EventKind::YieldClaimed);
        assert_eq!(
            EventKind::parse("OrderFilled"),
            EventKind::Unknown("OrderFilled".to_string())
        );
    }

    #[test]
    fn investment_payload_decodes_camel_case() {
        let payload: InvestmentMadePayload = serde_json::from_value(json!({
            "investorAddress": "0xaaa",
            "sukukAddress": "0xbbb",
            "tokenAmount": "1000000000000000000"
        }))
        .unwrap();
        assert_eq!(payload.investor_address, "0xaaa");
        assert_eq!(payload.token_amount, "1000000000000000000");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<InvestmentMadePayload, _> = serde_json::from_value(json!({
            "investorAddress": "0xaaa",
            "sukukAddress": "0xbbb",
            "tokenAmount": "1",
            "surprise": true
        }));
        assert!(result.is_err());
    }

    #[test]
    fn missing_fields_are_rejected() {
        let result: Result<YieldClaimedPayload, _> = serde_json::from_value(json!({
            "investorAddress": "0xaaa",
            "sukukAddress": "0xbbb"
        }));
        assert!(result.is_err());
    }
}
