use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::middleware::RequestId;

use super::campaigns::CampaignItem;
use super::{map_db_error, ApiError, ApiResponse, AppState};

pub(super) async fn list_clients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let codes = reachlog_db::list_client_codes(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(codes, req_id.0))
}

pub(super) async fn list_client_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Vec<CampaignItem>>>, ApiError> {
    let rows = reachlog_db::list_campaigns_by_client(&state.pool, &code, None)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CampaignItem::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}
