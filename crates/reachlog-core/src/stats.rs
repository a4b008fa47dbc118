//! Campaign Stats Engine.
//!
//! Turns the full snapshot log of one campaign into per-account deltas and a
//! campaign summary. The computation is pure: callers load the rows and the
//! campaign's costs, this module never touches storage.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{AccountStatus, CampaignCosts, Outcome, ReportedStatus, RestrictionBucket};
use crate::{SnapshotRecord, SnapshotType};

/// Derived result for one reported account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountResult {
    pub phone: String,
    pub status_before: AccountStatus,
    pub status_after: ReportedStatus,
    pub msg_sent: i64,
    pub inv_sent: i64,
    pub revenue: Decimal,
}

/// Count and message total of one status bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketTally {
    pub count: u64,
    pub messages: i64,
    pub avg_messages: f64,
}

impl BucketTally {
    fn record(&mut self, messages: i64) {
        self.count += 1;
        self.messages += messages;
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&mut self) {
        self.avg_messages = safe_ratio(self.messages as f64, self.count);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub accounts_reported: u64,
    pub total_revenue: Decimal,
    pub total_messages: i64,
    pub total_invites: i64,
    pub accounts_restricted: u64,
    pub percentage_restricted: f64,
    pub avg_msg_all: f64,
    pub avg_revenue_per_account: Decimal,
    pub frozen: BucketTally,
    pub temp_spam: BucketTally,
    pub perm_spam: BucketTally,
    pub temp_spam_resolved: BucketTally,
}

impl CampaignSummary {
    fn bucket_mut(&mut self, bucket: RestrictionBucket) -> &mut BucketTally {
        match bucket {
            RestrictionBucket::Frozen => &mut self.frozen,
            RestrictionBucket::TemporarySpamblock => &mut self.temp_spam,
            RestrictionBucket::PermanentOrBanned => &mut self.perm_spam,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&mut self) {
        let n = self.accounts_reported;
        self.percentage_restricted = safe_ratio(self.accounts_restricted as f64, n) * 100.0;
        self.avg_msg_all = safe_ratio(self.total_messages as f64, n);
        self.avg_revenue_per_account = safe_decimal_ratio(self.total_revenue, n);
        for tally in [
            &mut self.frozen,
            &mut self.temp_spam,
            &mut self.perm_spam,
            &mut self.temp_spam_resolved,
        ] {
            tally.finish();
        }
    }
}

/// Summary plus per-account results, in grouping (first-seen) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignReport {
    pub summary: CampaignSummary,
    pub results: Vec<AccountResult>,
}

/// Snapshots of one account, at most one retained row per type.
struct AccountSnapshots<'a> {
    phone: &'a str,
    latest: [Option<&'a SnapshotRecord>; 4],
    passed_temporary_block: bool,
}

impl<'a> AccountSnapshots<'a> {
    fn new(phone: &'a str) -> Self {
        Self {
            phone,
            latest: [None; 4],
            passed_temporary_block: false,
        }
    }

    fn push(&mut self, row: &'a SnapshotRecord) {
        if row.snapshot_type.is_post_campaign()
            && row.status == AccountStatus::TemporarySpamblock
        {
            self.passed_temporary_block = true;
        }

        let slot = &mut self.latest[row.snapshot_type.index()];
        if let Some(current) = *slot {
            tracing::warn!(
                campaign_id = row.campaign_id,
                phone = %row.phone,
                snapshot_type = %row.snapshot_type,
                tied = current.recorded_at == row.recorded_at,
                "duplicate snapshot rows; keeping the most recent"
            );
            // Ties go to the row seen last.
            if row.recorded_at < current.recorded_at {
                return;
            }
        }
        *slot = Some(row);
    }

    fn get(&self, snapshot_type: SnapshotType) -> Option<&'a SnapshotRecord> {
        self.latest[snapshot_type.index()]
    }

    /// `status_update` > `after_day_2` > `after_immediate`.
    fn effective_after(&self) -> Option<&'a SnapshotRecord> {
        SnapshotType::AFTER_PRIORITY
            .into_iter()
            .find_map(|t| self.get(t))
    }
}

fn group_by_account(snapshots: &[SnapshotRecord]) -> Vec<AccountSnapshots<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut accounts: Vec<AccountSnapshots<'_>> = Vec::new();

    for row in snapshots {
        let slot = *index.entry(row.phone.as_str()).or_insert_with(|| {
            accounts.push(AccountSnapshots::new(row.phone.as_str()));
            accounts.len() - 1
        });
        accounts[slot].push(row);
    }

    accounts
}

/// Derives the campaign report from every snapshot row of one campaign.
///
/// Accounts lacking a `before` row or any post-campaign row are left out, as
/// are accounts that sent nothing and ended `Working`.
#[must_use]
pub fn compute_campaign_stats(
    costs: &CampaignCosts,
    snapshots: &[SnapshotRecord],
) -> CampaignReport {
    let mut summary = CampaignSummary::default();
    let mut results = Vec::new();

    for account in group_by_account(snapshots) {
        let (Some(before), Some(after)) =
            (account.get(SnapshotType::Before), account.effective_after())
        else {
            continue;
        };

        let msg_sent = after.message_count - before.message_count;
        let inv_sent = after.invite_count - before.invite_count;
        let status_after = after.status;

        if msg_sent == 0 && inv_sent == 0 && status_after == AccountStatus::Working {
            continue;
        }

        let outcome = Outcome::resolve(status_after, account.passed_temporary_block);
        match outcome {
            Outcome::Healthy => {}
            Outcome::Resolved => summary.temp_spam_resolved.record(msg_sent),
            Outcome::Restricted(bucket) => {
                summary.accounts_restricted += 1;
                summary.bucket_mut(bucket).record(msg_sent);
            }
        }

        let revenue = costs.revenue(msg_sent, inv_sent);
        summary.accounts_reported += 1;
        summary.total_revenue += revenue;
        summary.total_messages += msg_sent;
        summary.total_invites += inv_sent;

        results.push(AccountResult {
            phone: account.phone.to_string(),
            status_before: before.status,
            status_after: outcome.reported_status(status_after),
            msg_sent,
            inv_sent,
            revenue,
        });
    }

    summary.finish();
    CampaignReport { summary, results }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn safe_ratio(numerator: f64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

pub(crate) fn safe_decimal_ratio(numerator: Decimal, denominator: u64) -> Decimal {
    if denominator == 0 {
        Decimal::ZERO
    } else {
        numerator / Decimal::from(denominator)
    }
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
