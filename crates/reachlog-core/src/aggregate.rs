//! Aggregation Layer: folds per-campaign reports into one cross-campaign view.
//!
//! Account counts are set cardinalities (an account seen in several campaigns
//! counts once) while restricted message and revenue totals are flows summed
//! per campaign appearance. Both period and client reports go through
//! [`CampaignFold`], so the two cannot drift apart.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::stats::{safe_decimal_ratio, safe_ratio};
use crate::{CampaignReport, CampaignSummary};

/// Identity of a campaign taking part in an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignRef {
    pub id: i64,
    pub name: String,
    pub campaign_date: NaiveDate,
}

/// One campaign's line in an aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignBreakdown {
    pub campaign_id: i64,
    pub name: String,
    pub campaign_date: NaiveDate,
    pub summary: CampaignSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_campaigns: u64,
    pub total_unique_accounts: u64,
    pub total_revenue: Decimal,
    pub total_messages: i64,
    pub total_invites: i64,
    pub total_restricted_accounts: u64,
    pub restricted_messages_total: i64,
    pub restricted_revenue_total: Decimal,
    pub percentage_restricted: f64,
    pub avg_revenue_per_account: Decimal,
    pub avg_messages_all_accounts: f64,
    pub avg_messages_restricted_accounts: f64,
    pub avg_revenue_per_restricted_account: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReport {
    pub summary: AggregateSummary,
    pub campaigns: Vec<CampaignBreakdown>,
}

/// Running fold over campaign reports.
#[derive(Debug, Default)]
pub struct CampaignFold {
    unique_accounts: HashSet<String>,
    restricted_accounts: HashSet<String>,
    summary: AggregateSummary,
    campaigns: Vec<CampaignBreakdown>,
}

impl CampaignFold {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, campaign: &CampaignRef, report: &CampaignReport) {
        let totals = &mut self.summary;
        totals.total_campaigns += 1;
        totals.total_revenue += report.summary.total_revenue;
        totals.total_messages += report.summary.total_messages;
        totals.total_invites += report.summary.total_invites;

        for result in &report.results {
            self.unique_accounts.insert(result.phone.clone());
            if result.status_after.is_restricted() {
                self.restricted_accounts.insert(result.phone.clone());
                totals.restricted_messages_total += result.msg_sent;
                totals.restricted_revenue_total += result.revenue;
            }
        }

        self.campaigns.push(CampaignBreakdown {
            campaign_id: campaign.id,
            name: campaign.name.clone(),
            campaign_date: campaign.campaign_date,
            summary: report.summary.clone(),
        });
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> AggregateReport {
        let mut summary = self.summary;
        let unique = self.unique_accounts.len() as u64;
        let restricted = self.restricted_accounts.len() as u64;

        summary.total_unique_accounts = unique;
        summary.total_restricted_accounts = restricted;
        summary.percentage_restricted = safe_ratio(restricted as f64, unique) * 100.0;
        summary.avg_revenue_per_account = safe_decimal_ratio(summary.total_revenue, unique);
        summary.avg_messages_all_accounts = safe_ratio(summary.total_messages as f64, unique);
        summary.avg_messages_restricted_accounts =
            safe_ratio(summary.restricted_messages_total as f64, restricted);
        summary.avg_revenue_per_restricted_account =
            safe_decimal_ratio(summary.restricted_revenue_total, restricted);

        AggregateReport {
            summary,
            campaigns: self.campaigns,
        }
    }
}

/// Folds campaign reports in the order given.
#[must_use]
pub fn aggregate_reports<'a, I>(reports: I) -> AggregateReport
where
    I: IntoIterator<Item = (&'a CampaignRef, &'a CampaignReport)>,
{
    let mut fold = CampaignFold::new();
    for (campaign, report) in reports {
        fold.add(campaign, report);
    }
    fold.finish()
}
