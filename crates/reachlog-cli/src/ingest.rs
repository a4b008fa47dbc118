//! Command handlers for snapshot and account ingestion.
//!
//! Each handler scans the account folders, keeps the local roster current and
//! submits the result to the server. Per-account failures in `update-all`
//! are logged and skipped so one bad account does not abort the run.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reachlog_core::{ClientConfig, SnapshotType};

use crate::api_client::ReachlogClient;
use crate::roster::Roster;
use crate::scanner::{self, ScannedAccount};

/// Accounts found for a post-campaign snapshot.
#[derive(Debug, Default)]
pub(crate) struct CampaignScan {
    pub accounts: Vec<ScannedAccount>,
    /// Dead accounts that were not yet on the campaign's roster.
    pub new_dead: Vec<String>,
}

fn campaign_dir(config: &ClientConfig, campaign: &str) -> PathBuf {
    config.clients_dir.join(campaign)
}

/// Folder scanned for a `before` snapshot: the campaign's client folder when
/// it exists, otherwise the shared accounts folder.
pub(crate) fn before_dir(config: &ClientConfig, campaign: &str) -> PathBuf {
    let dir = campaign_dir(config, campaign);
    if dir.is_dir() {
        dir
    } else {
        config.accounts_dir.clone()
    }
}

/// Finds the roster's accounts for `campaign` plus any account in the
/// dead-after-campaign folder.
///
/// Folders are searched in order: the campaign's client folder, the accounts
/// folder, the dead-after-campaign folder. The first file seen for a phone
/// wins. Files inside the dead-after-campaign folder read as `Banned`.
pub(crate) fn collect_campaign_accounts(
    config: &ClientConfig,
    roster_phones: &BTreeSet<String>,
    campaign: &str,
    now: DateTime<Utc>,
) -> CampaignScan {
    let dead_dir = config.dead_after_campaign_dir.as_path();
    let search_paths = [
        campaign_dir(config, campaign),
        config.accounts_dir.clone(),
        config.dead_after_campaign_dir.clone(),
    ];

    let mut seen = HashSet::new();
    let mut scan = CampaignScan::default();

    for root in &search_paths {
        for path in scanner::json_files_recursive(root) {
            let dead = scanner::is_inside(&path, dead_dir);
            let account = match scanner::read_account_file(&path, dead, now) {
                Ok(account) => account,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable account file");
                    continue;
                }
            };
            if !seen.insert(account.phone.clone()) {
                continue;
            }
            let on_roster = roster_phones.contains(&account.phone);
            if !on_roster && !dead {
                continue;
            }
            if !on_roster {
                scan.new_dead.push(account.phone.clone());
            }
            scan.accounts.push(account);
        }
    }

    scan
}

/// `snapshot before`: scans the campaign's folder, submits the `before`
/// snapshot and records the campaign's membership in the roster.
///
/// # Errors
///
/// Returns an error if no accounts are found, the submission fails, or the
/// roster cannot be written.
pub(crate) async fn run_snapshot_before(
    config: &ClientConfig,
    client: &ReachlogClient,
    campaign: &str,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let dir = before_dir(config, campaign);
    let accounts = scanner::scan_folder(&dir, false, now);
    if accounts.is_empty() {
        anyhow::bail!("no account files found in {}", dir.display());
    }

    let processed = client
        .submit_snapshot(campaign, SnapshotType::Before, &accounts)
        .await
        .with_context(|| format!("failed to submit before snapshot for '{campaign}'"))?;

    let mut roster = Roster::load(&config.roster_path)?;
    roster.record(
        campaign,
        now.date_naive(),
        accounts.iter().map(|a| a.phone.clone()),
    );
    roster.save(&config.roster_path)?;

    tracing::info!(campaign, accounts = processed, "before snapshot submitted");
    println!("before snapshot for '{campaign}': {processed} accounts recorded");
    Ok(())
}

/// `snapshot after` / `snapshot next-day`: re-scans the roster's accounts
/// and submits a post-campaign snapshot.
///
/// Without `campaign` the roster's most recent campaign is used.
///
/// # Errors
///
/// Returns an error if the campaign is not on the roster, no accounts are
/// found, or the submission fails.
pub(crate) async fn run_snapshot_after(
    config: &ClientConfig,
    client: &ReachlogClient,
    campaign: Option<&str>,
    snapshot_type: SnapshotType,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let mut roster = Roster::load(&config.roster_path)?;

    let campaign = match campaign {
        Some(name) => name.to_string(),
        None => roster
            .most_recent_campaign()
            .map(ToOwned::to_owned)
            .context("no campaign given and the roster is empty")?,
    };
    let entry = roster
        .entry(&campaign)
        .with_context(|| format!("campaign '{campaign}' is not on the local roster"))?;

    let scan = collect_campaign_accounts(config, &entry.phones, &campaign, now);
    if scan.accounts.is_empty() {
        anyhow::bail!("no accounts found for campaign '{campaign}'");
    }

    if !scan.new_dead.is_empty() {
        let added = roster.append(&campaign, scan.new_dead.iter().cloned());
        roster.save(&config.roster_path)?;
        tracing::info!(campaign = %campaign, added, "new dead accounts added to roster");
    }

    let processed = client
        .submit_snapshot(&campaign, snapshot_type, &scan.accounts)
        .await
        .with_context(|| format!("failed to submit {snapshot_type} snapshot for '{campaign}'"))?;

    tracing::info!(
        campaign = %campaign,
        snapshot_type = %snapshot_type,
        accounts = processed,
        "post-campaign snapshot submitted"
    );
    println!("{snapshot_type} snapshot for '{campaign}': {processed} accounts recorded");
    Ok(())
}

/// `accounts update-all`: refreshes every known account, then records a
/// `status_update` for each account in the dead folder against the most
/// recent campaign it took part in.
///
/// # Errors
///
/// Returns an error if no account files exist, the roster is unreadable, or
/// the bulk refresh fails. Individual `status_update` failures are logged.
pub(crate) async fn run_update_all(
    config: &ClientConfig,
    client: &ReachlogClient,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let files: BTreeSet<PathBuf> = [&config.accounts_dir, &config.clients_dir]
        .into_iter()
        .flat_map(|root| scanner::json_files_recursive(root))
        .collect();
    if files.is_empty() {
        anyhow::bail!("no account files found");
    }
    let dead_dir = config.dead_dir.as_path();
    let (dead_files, live_files): (Vec<PathBuf>, Vec<PathBuf>) = files
        .iter()
        .cloned()
        .partition(|p| scanner::is_inside(p, dead_dir));
    let dead = scanner::read_files(&dead_files, |_| true, now);
    let mut accounts = scanner::read_files(&live_files, |_| false, now);
    accounts.extend(dead.iter().cloned());
    if accounts.is_empty() {
        anyhow::bail!("none of the {} account files could be read", files.len());
    }

    let written = client
        .refresh_accounts(&accounts)
        .await
        .context("bulk account refresh failed")?;
    println!("{written} accounts refreshed");

    let roster = Roster::load(&config.roster_path)?;
    let mut recorded = 0usize;
    for account in &dead {
        let Some(campaign) = roster.last_campaign_for(&account.phone) else {
            tracing::warn!(phone = %account.phone, "dead account has no campaign on the roster");
            continue;
        };
        match client
            .submit_snapshot(
                campaign,
                SnapshotType::StatusUpdate,
                std::slice::from_ref(account),
            )
            .await
        {
            Ok(_) => {
                recorded += 1;
                tracing::info!(phone = %account.phone, campaign, "ban recorded");
            }
            Err(e) => {
                tracing::error!(phone = %account.phone, campaign, error = %e, "status update failed");
            }
        }
    }

    println!("{recorded} bans recorded against their last campaign");
    Ok(())
}
