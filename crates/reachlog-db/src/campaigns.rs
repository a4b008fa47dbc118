//! Database operations for `campaigns`.

use chrono::{DateTime, NaiveDate, Utc};
use reachlog_core::{CampaignCosts, CampaignRef, DateRange, NewCampaign};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const CAMPAIGN_COLUMNS: &str = "id, name, campaign_date, cost_per_message, cost_per_invite, \
     message_type, base_type, link_type, offer, created_at";

const UNIQUE_VIOLATION: &str = "23505";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub name: String,
    pub campaign_date: NaiveDate,
    pub cost_per_message: Decimal,
    pub cost_per_invite: Decimal,
    pub message_type: Option<String>,
    pub base_type: Option<String>,
    pub link_type: Option<String>,
    pub offer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CampaignRow {
    /// # Errors
    ///
    /// Returns [`DbError::Malformed`] if a stored cost is negative.
    pub fn costs(&self) -> Result<CampaignCosts, DbError> {
        CampaignCosts::new(self.cost_per_message, self.cost_per_invite).map_err(DbError::from)
    }

    #[must_use]
    pub fn campaign_ref(&self) -> CampaignRef {
        CampaignRef {
            id: self.id,
            name: self.name.clone(),
            campaign_date: self.campaign_date,
        }
    }
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            DbError::CampaignNameTaken(name.to_string())
        }
        _ => DbError::Sqlx(err),
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a campaign dated `campaign_date`.
///
/// # Errors
///
/// Returns [`DbError::Malformed`] if the campaign fails validation,
/// [`DbError::CampaignNameTaken`] if the name exists, or [`DbError::Sqlx`].
pub async fn create_campaign(
    pool: &PgPool,
    campaign: NewCampaign,
    campaign_date: NaiveDate,
) -> Result<CampaignRow, DbError> {
    let campaign = campaign.validate()?;

    let sql = format!(
        "INSERT INTO campaigns \
         (name, campaign_date, cost_per_message, cost_per_invite, \
          message_type, base_type, link_type, offer) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {CAMPAIGN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(&campaign.name)
        .bind(campaign_date)
        .bind(campaign.cost_per_message)
        .bind(campaign.cost_per_invite)
        .bind(&campaign.message_type)
        .bind(&campaign.base_type)
        .bind(&campaign.link_type)
        .bind(&campaign.offer)
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, &campaign.name))?;

    tracing::info!(campaign_id = row.id, name = %row.name, "campaign created");
    Ok(row)
}

/// Replaces a campaign's name, costs and tags. The campaign date is kept.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, [`DbError::CampaignNameTaken`]
/// when renaming onto an existing name, [`DbError::Malformed`] on validation
/// failure, or [`DbError::Sqlx`].
pub async fn update_campaign(
    pool: &PgPool,
    id: i64,
    campaign: NewCampaign,
) -> Result<CampaignRow, DbError> {
    let campaign = campaign.validate()?;

    let sql = format!(
        "UPDATE campaigns \
         SET name = $1, cost_per_message = $2, cost_per_invite = $3, \
             message_type = $4, base_type = $5, link_type = $6, offer = $7 \
         WHERE id = $8 \
         RETURNING {CAMPAIGN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(&campaign.name)
        .bind(campaign.cost_per_message)
        .bind(campaign.cost_per_invite)
        .bind(&campaign.message_type)
        .bind(&campaign.base_type)
        .bind(&campaign.link_type)
        .bind(&campaign.offer)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_unique_violation(e, &campaign.name))?;

    row.ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::NotFound`] if no campaign has this id, or [`DbError::Sqlx`].
pub async fn get_campaign_by_id(pool: &PgPool, id: i64) -> Result<CampaignRow, DbError> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");
    sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no campaign has this name, or [`DbError::Sqlx`].
pub async fn get_campaign_by_name(pool: &PgPool, name: &str) -> Result<CampaignRow, DbError> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE name = $1");
    sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Lists campaigns newest first, optionally filtered by a case-insensitive
/// substring of the name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
) -> Result<Vec<CampaignRow>, DbError> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%') \
         ORDER BY id DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(search)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Distinct non-null offers, sorted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaign_offers(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let offers = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT offer FROM campaigns WHERE offer IS NOT NULL ORDER BY offer",
    )
    .fetch_all(pool)
    .await?;
    Ok(offers)
}

/// Campaigns dated within `range` (inclusive), newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns_in_range(
    pool: &PgPool,
    range: DateRange,
) -> Result<Vec<CampaignRow>, DbError> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE campaign_date BETWEEN $1 AND $2 \
         ORDER BY campaign_date DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(range.start())
        .bind(range.end())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Campaigns whose client code equals `client_code`, optionally limited to a
/// date range, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns_by_client(
    pool: &PgPool,
    client_code: &str,
    range: Option<DateRange>,
) -> Result<Vec<CampaignRow>, DbError> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE split_part(name, '_', 1) = $1 \
           AND ($2::date IS NULL OR campaign_date >= $2) \
           AND ($3::date IS NULL OR campaign_date <= $3) \
         ORDER BY campaign_date DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(client_code)
        .bind(range.map(|r| r.start()))
        .bind(range.map(|r| r.end()))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Sorted distinct client codes across all campaigns.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_client_codes(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let codes = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT split_part(name, '_', 1) AS code FROM campaigns ORDER BY code",
    )
    .fetch_all(pool)
    .await?;
    Ok(codes)
}
