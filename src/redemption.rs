// Composite redemption lifecycle view: raw request and approval rows are
// fetched independently from the indexer and merged here. An approval is
// matched to requests by (investor, sukuk); all requests from the same
// investor for the same sukuk therefore share one approval slot — a known
// limitation of the matching key.

use crate::indexer::rows::{RedemptionApprovalRow, RedemptionRequestRow};
use crate::indexer::{EventFilter, IndexerError, IndexerQueries};
use crate::tokenmath;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    Requested,
    Approved,
}

/// One request with its approval (if any) folded in.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionView {
    pub investor_address: String,
    pub sukuk_address: String,
    pub requested_amount: String,
    pub request_tx_hash: String,
    pub requested_at: DateTime<Utc>,
    pub status: RedemptionStatus,
    pub approved_amount: Option<String>,
    pub approval_tx_hash: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedemptionStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub total_requested_amount: String,
    pub total_approved_amount: String,
}

impl Default for RedemptionStats {
    fn default() -> Self {
        Self {
            total: 0,
            pending: 0,
            approved: 0,
            total_requested_amount: "0".to_string(),
            total_approved_amount: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RedemptionSummary {
    pub overall: RedemptionStats,
    pub by_sukuk: BTreeMap<String, RedemptionStats>,
}

/// Merges approval rows into request rows by (investor, sukuk). Requests
/// with no matching approval stay `requested`; matched requests become
/// `approved` with the approval's time, tx and amount copied across.
/// When several approvals share a key, the one with the latest block
/// timestamp wins, whatever order the rows arrive in.
pub fn merge_redemptions(
    requests: Vec<RedemptionRequestRow>,
    approvals: Vec<RedemptionApprovalRow>,
) -> Vec<RedemptionView> {
    let mut approvals_by_key: HashMap<(String, String), RedemptionApprovalRow> = HashMap::new();
    for approval in approvals {
        let key = (approval.investor_address.clone(), approval.sukuk_address.clone());
        let newer = approvals_by_key
            .get(&key)
            .map_or(true, |existing| approval.block_timestamp > existing.block_timestamp);
        if newer {
            approvals_by_key.insert(key, approval);
        }
    }

    requests
        .into_iter()
        .map(|request| {
            let key = (request.investor_address.clone(), request.sukuk_address.clone());
            match approvals_by_key.get(&key) {
                Some(approval) => RedemptionView {
                    investor_address: request.investor_address,
                    sukuk_address: request.sukuk_address,
                    requested_amount: request.token_amount,
                    request_tx_hash: request.tx_hash,
                    requested_at: request.block_timestamp,
                    status: RedemptionStatus::Approved,
                    approved_amount: Some(approval.approved_amount.clone()),
                    approval_tx_hash: Some(approval.tx_hash.clone()),
                    approved_at: Some(approval.block_timestamp),
                },
                None => RedemptionView {
                    investor_address: request.investor_address,
                    sukuk_address: request.sukuk_address,
                    requested_amount: request.token_amount,
                    request_tx_hash: request.tx_hash,
                    requested_at: request.block_timestamp,
                    status: RedemptionStatus::Requested,
                    approved_amount: None,
                    approval_tx_hash: None,
                    approved_at: None,
                },
            }
        })
        .collect()
}

/// Counts and big-integer amount sums, overall and grouped by sukuk.
pub fn compute_summary(views: &[RedemptionView]) -> RedemptionSummary {
    let mut summary = RedemptionSummary::default();

    for view in views {
        accumulate(&mut summary.overall, view);
        let per_sukuk = summary
            .by_sukuk
            .entry(view.sukuk_address.clone())
            .or_default();
        accumulate(per_sukuk, view);
    }
    summary
}

fn accumulate(stats: &mut RedemptionStats, view: &RedemptionView) {
    stats.total += 1;
    stats.total_requested_amount =
        tokenmath::add(&stats.total_requested_amount, &view.requested_amount)
            .unwrap_or_else(|_| stats.total_requested_amount.clone());
    match view.status {
        RedemptionStatus::Requested => stats.pending += 1,
        RedemptionStatus::Approved => {
            stats.approved += 1;
            if let Some(amount) = &view.approved_amount {
                stats.total_approved_amount =
                    tokenmath::add(&stats.total_approved_amount, amount)
                        .unwrap_or_else(|_| stats.total_approved_amount.clone());
            }
        }
    }
}

pub struct RedemptionMergeService {
    queries: Arc<IndexerQueries>,
}

impl RedemptionMergeService {
    pub fn new(queries: Arc<IndexerQueries>) -> Self {
        Self { queries }
    }

    /// Lifecycle view for one investor. An investor with no requests gets
    /// an empty vec, not an error; a missing table propagates.
    pub async fn lifecycle_for_investor(
        &self,
        investor: &str,
    ) -> Result<Vec<RedemptionView>, IndexerError> {
        let filter = EventFilter::by_address(investor);
        self.merged(&filter).await
    }

    pub async fn lifecycle_for_sukuk(
        &self,
        sukuk: &str,
    ) -> Result<Vec<RedemptionView>, IndexerError> {
        let filter = EventFilter::by_sukuk(sukuk);
        self.merged(&filter).await
    }

    /// Aggregate statistics over every redemption currently visible.
    pub async fn summary(&self) -> Result<RedemptionSummary, IndexerError> {
        let views = self.merged(&EventFilter::default()).await?;
        Ok(compute_summary(&views))
    }

    async fn merged(&self, filter: &EventFilter) -> Result<Vec<RedemptionView>, IndexerError> {
        let (requests, approvals) = futures::future::try_join(
            self.queries.redemption_requests(filter),
            self.queries.redemption_approvals(filter),
        )
        .await?;
        Ok(merge_redemptions(requests, approvals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn request(investor: &str, sukuk: &str, amount: &str) -> RedemptionRequestRow {
        RedemptionRequestRow {
            investor_address: investor.to_string(),
            sukuk_address: sukuk.to_string(),
            token_amount: amount.to_string(),
            tx_hash: format!("req-{}-{}", investor, sukuk),
            block_timestamp: ts(1_000),
        }
    }

    fn approval(investor: &str, sukuk: &str, amount: &str) -> RedemptionApprovalRow {
        RedemptionApprovalRow {
            investor_address: investor.to_string(),
            sukuk_address: sukuk.to_string(),
            approved_amount: amount.to_string(),
            tx_hash: format!("app-{}-{}", investor, sukuk),
            block_timestamp: ts(2_000),
        }
    }

    #[test]
    fn unmatched_request_stays_requested() {
        let views = merge_redemptions(vec![request("0xa", "0xs1", "100")], vec![]);

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].status, RedemptionStatus::Requested);
        assert!(views[0].approved_amount.is_none());
        assert!(views[0].approved_at.is_none());
    }

    #[test]
    fn matched_request_carries_approval_fields() {
        let views = merge_redemptions(
            vec![request("0xa", "0xs1", "100")],
            vec![approval("0xa", "0xs1", "80")],
        );

        assert_eq!(views[0].status, RedemptionStatus::Approved);
        assert_eq!(views[0].approved_amount.as_deref(), Some("80"));
        assert_eq!(views[0].approval_tx_hash.as_deref(), Some("app-0xa-0xs1"));
        assert_eq!(views[0].approved_at, Some(ts(2_000)));
    }

    #[test]
    fn approval_for_other_sukuk_does_not_match() {
        let views = merge_redemptions(
            vec![request("0xa", "0xs1", "100")],
            vec![approval("0xa", "0xs2", "80")],
        );
        assert_eq!(views[0].status, RedemptionStatus::Requested);
    }

    #[test]
    fn duplicate_requests_share_one_approval() {
        // Known limitation of the (investor, sukuk) key
        let views = merge_redemptions(
            vec![request("0xa", "0xs1", "100"), request("0xa", "0xs1", "50")],
            vec![approval("0xa", "0xs1", "100")],
        );
        assert!(views.iter().all(|v| v.status == RedemptionStatus::Approved));
    }

    #[test]
    fn latest_approval_wins_regardless_of_row_order() {
        let mut newest = approval("0xa", "0xs1", "90");
        newest.block_timestamp = ts(3_000);
        let mut oldest = approval("0xa", "0xs1", "40");
        oldest.block_timestamp = ts(1_500);

        // Query results arrive newest-first, but the merge must not depend
        // on that
        for approvals in [
            vec![newest.clone(), oldest.clone()],
            vec![oldest.clone(), newest.clone()],
        ] {
            let views = merge_redemptions(vec![request("0xa", "0xs1", "100")], approvals);
            assert_eq!(views[0].approved_amount.as_deref(), Some("90"));
            assert_eq!(views[0].approved_at, Some(ts(3_000)));
        }
    }

    #[test]
    fn empty_inputs_give_empty_views() {
        assert!(merge_redemptions(vec![], vec![]).is_empty());
    }

    #[test]
    fn summary_counts_and_sums() {
        let views = merge_redemptions(
            vec![
                request("0xa", "0xs1", "100"),
                request("0xb", "0xs1", "200"),
                request("0xc", "0xs2", "300"),
            ],
            vec![approval("0xb", "0xs1", "150")],
        );
        let summary = compute_summary(&views);

        assert_eq!(summary.overall.total, 3);
        assert_eq!(summary.overall.pending, 2);
        assert_eq!(summary.overall.approved, 1);
        assert_eq!(summary.overall.total_requested_amount, "600");
        assert_eq!(summary.overall.total_approved_amount, "150");

        let s1 = &summary.by_sukuk["0xs1"];
        assert_eq!(s1.total, 2);
        assert_eq!(s1.total_requested_amount, "300");
        assert_eq!(s1.total_approved_amount, "150");
        let s2 = &summary.by_sukuk["0xs2"];
        assert_eq!(s2.pending, 1);
        assert_eq!(s2.total_approved_amount, "0");
    }

    #[test]
    fn summary_of_wei_scale_amounts_is_exact() {
        let big = "500000000000000000000000000000000000000";
        let views = merge_redemptions(
            vec![request("0xa", "0xs1", big), request("0xb", "0xs1", big)],
            vec![],
        );
        let summary = compute_summary(&views);
        assert_eq!(
            summary.overall.total_requested_amount,
            "1000000000000000000000000000000000000000"
        );
    }
}
