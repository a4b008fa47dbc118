//! Snapshot ingestion: `POST /api/v1/snapshots`.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{NaiveDate, Utc};
use reachlog_core::{AccountStatus, SnapshotType};
use reachlog_db::{AccountReading, SnapshotBatch};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

/// One account as reported by the ingestion client.
#[derive(Debug, Deserialize)]
pub(super) struct AccountReadingRequest {
    pub phone: String,
    pub status: AccountStatus,
    pub messages_sent: i64,
    pub invites_sent: i64,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
}

impl AccountReadingRequest {
    pub(super) fn into_reading(self) -> AccountReading {
        AccountReading {
            phone: self.phone.trim().to_string(),
            status: self.status,
            messages_sent: self.messages_sent,
            invites_sent: self.invites_sent,
            registration_date: self.registration_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SnapshotBatchRequest {
    pub campaign_name: String,
    pub snapshot_type: SnapshotType,
    pub accounts: Vec<AccountReadingRequest>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestResult {
    pub accounts_processed: u64,
}

/// Checks that every reading names an account and carries non-negative counters.
pub(super) fn validate_readings(
    req_id: &str,
    readings: &[AccountReadingRequest],
) -> Result<(), ApiError> {
    for reading in readings {
        if reading.phone.trim().is_empty() {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                "every account needs a phone",
            ));
        }
        if reading.messages_sent < 0 || reading.invites_sent < 0 {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                format!("account {} has negative counters", reading.phone),
            ));
        }
    }
    Ok(())
}

pub(super) async fn ingest_snapshots(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SnapshotBatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IngestResult>>), ApiError> {
    let rid = &req_id.0;

    let campaign_name = body.campaign_name.trim().to_string();
    if campaign_name.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "campaign_name must not be empty",
        ));
    }
    validate_readings(rid, &body.accounts)?;

    let batch = SnapshotBatch {
        campaign_name,
        snapshot_type: body.snapshot_type,
        accounts: body
            .accounts
            .into_iter()
            .map(AccountReadingRequest::into_reading)
            .collect(),
    };

    let processed = reachlog_db::ingest_snapshot_batch(&state.pool, &batch, Utc::now())
        .await
        .map_err(|e| match e {
            reachlog_db::DbError::NotFound => ApiError::new(
                rid,
                "not_found",
                format!("campaign '{}' not found", batch.campaign_name),
            ),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(
            IngestResult {
                accounts_processed: processed,
            },
            req_id.0,
        ),
    ))
}
