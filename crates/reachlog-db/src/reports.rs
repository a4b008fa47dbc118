//! Report composition: loads snapshot rows and hands them to the pure engine.

use reachlog_core::{AggregateReport, CampaignFold, CampaignReport, WarmupBracketStats};
use sqlx::PgPool;

use crate::{get_campaign_costs, get_snapshots, list_warmup_accounts, CampaignRow, DbError};

/// Recomputes the report of one campaign from its full snapshot log.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign does not exist,
/// [`DbError::Malformed`] for rows outside the vocabulary, or [`DbError::Sqlx`].
pub async fn compute_campaign_stats(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<CampaignReport, DbError> {
    let costs = get_campaign_costs(pool, campaign_id).await?;
    let snapshots = get_snapshots(pool, campaign_id).await?;
    Ok(reachlog_core::compute_campaign_stats(&costs, &snapshots))
}

/// Folds the reports of `campaigns` in the order given.
///
/// # Errors
///
/// Propagates the first error from loading any campaign's snapshots.
pub async fn aggregate_campaigns(
    pool: &PgPool,
    campaigns: &[CampaignRow],
) -> Result<AggregateReport, DbError> {
    let mut fold = CampaignFold::new();
    for campaign in campaigns {
        let costs = campaign.costs()?;
        let snapshots = get_snapshots(pool, campaign.id).await?;
        let report = reachlog_core::compute_campaign_stats(&costs, &snapshots);
        fold.add(&campaign.campaign_ref(), &report);
    }
    Ok(fold.finish())
}

/// # Errors
///
/// Returns [`DbError`] if the accounts cannot be loaded.
pub async fn warmup_report(pool: &PgPool) -> Result<Vec<WarmupBracketStats>, DbError> {
    let accounts = list_warmup_accounts(pool).await?;
    Ok(reachlog_core::warmup_report(&accounts))
}
