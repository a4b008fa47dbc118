//! Snapshot log reads and the transactional ingestion path.

use chrono::{DateTime, NaiveDate, Utc};
use reachlog_core::{AccountStatus, CampaignCosts, SnapshotRecord, SnapshotType};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `campaign_log` table, vocabulary columns still as text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub campaign_id: i64,
    pub account_phone: String,
    pub snapshot_type: String,
    pub messages_count: i64,
    pub invites_count: i64,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for SnapshotRecord {
    type Error = DbError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(SnapshotRecord {
            campaign_id: row.campaign_id,
            snapshot_type: row.snapshot_type.parse()?,
            status: row.status.parse()?,
            phone: row.account_phone,
            message_count: row.messages_count,
            invite_count: row.invites_count,
            recorded_at: row.recorded_at,
        })
    }
}

/// One account's counters as read by the ingestion client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReading {
    pub phone: String,
    pub status: AccountStatus,
    pub messages_sent: i64,
    pub invites_sent: i64,
    pub registration_date: Option<NaiveDate>,
}

/// A snapshot of many accounts for one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBatch {
    pub campaign_name: String,
    pub snapshot_type: SnapshotType,
    pub accounts: Vec<AccountReading>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Every snapshot row of a campaign, oldest first, ties broken by insertion id.
///
/// # Errors
///
/// Returns [`DbError::Malformed`] if a stored row carries an unknown
/// `snapshot_type` or `status`, or [`DbError::Sqlx`] if the query fails.
pub async fn get_snapshots(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<Vec<SnapshotRecord>, DbError> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, campaign_id, account_phone, snapshot_type, messages_count, \
                invites_count, status, recorded_at \
         FROM campaign_log \
         WHERE campaign_id = $1 \
         ORDER BY recorded_at, id",
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SnapshotRecord::try_from).collect()
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign does not exist,
/// [`DbError::Malformed`] if a stored cost is negative, or [`DbError::Sqlx`].
pub async fn get_campaign_costs(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<CampaignCosts, DbError> {
    let (per_message, per_invite) = sqlx::query_as::<_, (Decimal, Decimal)>(
        "SELECT cost_per_message, cost_per_invite FROM campaigns WHERE id = $1",
    )
    .bind(campaign_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    CampaignCosts::new(per_message, per_invite).map_err(DbError::from)
}

/// Appends one snapshot row as-is, without touching the account's counters.
///
/// The account must already exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including foreign-key
/// violations for an unknown campaign or account.
pub async fn append_snapshot(pool: &PgPool, record: &SnapshotRecord) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO campaign_log \
         (campaign_id, account_phone, snapshot_type, messages_count, invites_count, \
          status, recorded_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(record.campaign_id)
    .bind(&record.phone)
    .bind(record.snapshot_type.as_str())
    .bind(record.message_count)
    .bind(record.invite_count)
    .bind(record.status.as_str())
    .bind(record.recorded_at)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Applies a snapshot batch atomically and returns the number of accounts
/// processed.
///
/// For each account: the account row is created or refreshed, post-campaign
/// snapshots add the revenue earned since the previous reading to the
/// account's lifetime revenue, `before` snapshots stamp `first_campaign_date`
/// when it is unset, and the snapshot row is appended to the log. Either the
/// whole batch commits or none of it does.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign name is unknown, or
/// [`DbError::Sqlx`] if any statement fails (the transaction is rolled back).
pub async fn ingest_snapshot_batch(
    pool: &PgPool,
    batch: &SnapshotBatch,
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let (campaign_id, per_message, per_invite) =
        sqlx::query_as::<_, (i64, Decimal, Decimal)>(
            "SELECT id, cost_per_message, cost_per_invite FROM campaigns WHERE name = $1",
        )
        .bind(&batch.campaign_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;
    let costs = CampaignCosts::new(per_message, per_invite)?;

    let mut processed: u64 = 0;
    for reading in &batch.accounts {
        apply_reading(&mut tx, campaign_id, &costs, batch.snapshot_type, reading, now).await?;
        processed += 1;
    }

    tx.commit().await?;

    tracing::info!(
        campaign_id,
        snapshot_type = %batch.snapshot_type,
        accounts = processed,
        "snapshot batch ingested"
    );
    Ok(processed)
}

async fn apply_reading(
    tx: &mut Transaction<'_, Postgres>,
    campaign_id: i64,
    costs: &CampaignCosts,
    snapshot_type: SnapshotType,
    reading: &AccountReading,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let is_before = snapshot_type == SnapshotType::Before;
    let today = now.date_naive();

    // A concurrent batch introducing the same phone makes this a no-op; the
    // locked update below then waits for that batch to commit.
    let inserted = sqlx::query_scalar::<_, String>(
        "INSERT INTO accounts \
         (phone, registration_date, first_campaign_date, current_status, \
          total_messages, total_invites, total_revenue, last_updated) \
         VALUES ($1, $2, $3, $4, $5, $6, 0, $7) \
         ON CONFLICT (phone) DO NOTHING \
         RETURNING phone",
    )
    .bind(&reading.phone)
    .bind(reading.registration_date)
    .bind(is_before.then_some(today))
    .bind(reading.status.as_str())
    .bind(reading.messages_sent)
    .bind(reading.invites_sent)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await?;

    if inserted.is_none() {
        let (prev_messages, prev_invites) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT total_messages, total_invites FROM accounts WHERE phone = $1 FOR UPDATE",
        )
        .bind(&reading.phone)
        .fetch_one(&mut **tx)
        .await?;

        let revenue_delta = if snapshot_type.is_post_campaign() {
            costs.revenue(
                reading.messages_sent - prev_messages,
                reading.invites_sent - prev_invites,
            )
        } else {
            Decimal::ZERO
        };

        sqlx::query(
            "UPDATE accounts \
             SET current_status = $1, total_messages = $2, total_invites = $3, \
                 total_revenue = total_revenue + $4, last_updated = $5, \
                 first_campaign_date = CASE WHEN $6 THEN COALESCE(first_campaign_date, $7) \
                                            ELSE first_campaign_date END \
             WHERE phone = $8",
        )
        .bind(reading.status.as_str())
        .bind(reading.messages_sent)
        .bind(reading.invites_sent)
        .bind(revenue_delta)
        .bind(now)
        .bind(is_before)
        .bind(today)
        .bind(&reading.phone)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO campaign_log \
         (campaign_id, account_phone, snapshot_type, messages_count, invites_count, \
          status, recorded_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(campaign_id)
    .bind(&reading.phone)
    .bind(snapshot_type.as_str())
    .bind(reading.messages_sent)
    .bind(reading.invites_sent)
    .bind(reading.status.as_str())
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
