//! Bulk account refresh: `POST /api/v1/accounts/bulk`.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::snapshots::{validate_readings, AccountReadingRequest};
use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct BulkAccountsRequest {
    pub accounts: Vec<AccountReadingRequest>,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkAccountsResult {
    pub accounts_written: u64,
}

pub(super) async fn bulk_upsert_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkAccountsRequest>,
) -> Result<Json<ApiResponse<BulkAccountsResult>>, ApiError> {
    validate_readings(&req_id.0, &body.accounts)?;

    let readings: Vec<_> = body
        .accounts
        .into_iter()
        .map(AccountReadingRequest::into_reading)
        .collect();

    let written = reachlog_db::upsert_accounts(&state.pool, &readings, Utc::now())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        BulkAccountsResult {
            accounts_written: written,
        },
        req_id.0,
    ))
}
