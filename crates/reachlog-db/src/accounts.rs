//! Database operations for `accounts`.

use chrono::{DateTime, NaiveDate, Utc};
use reachlog_core::WarmupAccount;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{AccountReading, DbError};

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub phone: String,
    pub registration_date: Option<NaiveDate>,
    pub first_campaign_date: Option<NaiveDate>,
    pub current_status: String,
    pub total_messages: i64,
    pub total_invites: i64,
    pub total_revenue: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown phone, or [`DbError::Sqlx`].
pub async fn get_account(pool: &PgPool, phone: &str) -> Result<AccountRow, DbError> {
    sqlx::query_as::<_, AccountRow>(
        "SELECT phone, registration_date, first_campaign_date, current_status, \
                total_messages, total_invites, total_revenue, last_updated \
         FROM accounts WHERE phone = $1",
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Bulk refresh of account status and counters, creating missing accounts.
///
/// Lifetime revenue and `first_campaign_date` are left alone. A known
/// registration date is never overwritten with an unknown one. Runs in a
/// single transaction; returns the number of accounts written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_accounts(
    pool: &PgPool,
    accounts: &[AccountReading],
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut written: u64 = 0;

    for account in accounts {
        let result = sqlx::query(
            "INSERT INTO accounts \
             (phone, registration_date, current_status, total_messages, total_invites, \
              total_revenue, last_updated) \
             VALUES ($1, $2, $3, $4, $5, 0, $6) \
             ON CONFLICT (phone) DO UPDATE SET \
               registration_date = COALESCE(EXCLUDED.registration_date, accounts.registration_date), \
               current_status = EXCLUDED.current_status, \
               total_messages = EXCLUDED.total_messages, \
               total_invites = EXCLUDED.total_invites, \
               last_updated = EXCLUDED.last_updated",
        )
        .bind(&account.phone)
        .bind(account.registration_date)
        .bind(account.status.as_str())
        .bind(account.messages_sent)
        .bind(account.invites_sent)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    tracing::info!(accounts = written, "accounts refreshed");
    Ok(written)
}

#[derive(sqlx::FromRow)]
struct WarmupRow {
    phone: String,
    registration_date: Option<NaiveDate>,
    first_campaign_date: NaiveDate,
    total_revenue: Decimal,
    total_messages: i64,
    current_status: String,
}

impl TryFrom<WarmupRow> for WarmupAccount {
    type Error = DbError;

    fn try_from(row: WarmupRow) -> Result<Self, Self::Error> {
        Ok(WarmupAccount {
            current_status: row.current_status.parse()?,
            phone: row.phone,
            registration_date: row.registration_date,
            first_campaign_date: row.first_campaign_date,
            total_revenue: row.total_revenue,
            total_messages: row.total_messages,
        })
    }
}

/// Accounts that have taken part in at least one campaign, as warmup inputs.
///
/// # Errors
///
/// Returns [`DbError::Malformed`] if a stored status is outside the
/// vocabulary, or [`DbError::Sqlx`] if the query fails.
pub async fn list_warmup_accounts(pool: &PgPool) -> Result<Vec<WarmupAccount>, DbError> {
    let rows = sqlx::query_as::<_, WarmupRow>(
        "SELECT phone, registration_date, first_campaign_date, total_revenue, \
                total_messages, current_status \
         FROM accounts \
         WHERE first_campaign_date IS NOT NULL \
         ORDER BY phone",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(WarmupAccount::try_from).collect()
}
