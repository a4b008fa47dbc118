//! Campaign master data handlers.
//!
//! - `POST /api/v1/campaigns`: create, dated today
//! - `GET  /api/v1/campaigns`: newest first, optional name search
//! - `GET  /api/v1/campaigns/offers`: distinct offer tags
//! - `GET  /api/v1/campaigns/{id}`: one campaign
//! - `PUT  /api/v1/campaigns/{id}`: replace name, costs and tags

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use reachlog_core::NewCampaign;
use reachlog_db::CampaignRow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, validation_error, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct CampaignItem {
    pub id: i64,
    pub name: String,
    pub client_code: String,
    pub campaign_date: NaiveDate,
    pub cost_per_message: Decimal,
    pub cost_per_invite: Decimal,
    pub message_type: Option<String>,
    pub base_type: Option<String>,
    pub link_type: Option<String>,
    pub offer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CampaignRow> for CampaignItem {
    fn from(row: CampaignRow) -> Self {
        Self {
            client_code: reachlog_core::client_code(&row.name).to_string(),
            id: row.id,
            name: row.name,
            campaign_date: row.campaign_date,
            cost_per_message: row.cost_per_message,
            cost_per_invite: row.cost_per_invite,
            message_type: row.message_type,
            base_type: row.base_type,
            link_type: row.link_type,
            offer: row.offer,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CampaignQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

fn validate(req_id: &str, body: NewCampaign) -> Result<NewCampaign, ApiError> {
    body.validate().map_err(|e| validation_error(req_id, &e))
}

pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewCampaign>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignItem>>), ApiError> {
    let campaign = validate(&req_id.0, body)?;

    let row = reachlog_db::create_campaign(&state.pool, campaign, Utc::now().date_naive())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(CampaignItem::from(row), req_id.0),
    ))
}

pub(super) async fn update_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<NewCampaign>,
) -> Result<Json<ApiResponse<CampaignItem>>, ApiError> {
    let campaign = validate(&req_id.0, body)?;

    let row = reachlog_db::update_campaign(&state.pool, id, campaign)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(CampaignItem::from(row), req_id.0))
}

pub(super) async fn get_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CampaignItem>>, ApiError> {
    let row = reachlog_db::get_campaign_by_id(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(CampaignItem::from(row), req_id.0))
}

pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CampaignQuery>,
) -> Result<Json<ApiResponse<Vec<CampaignItem>>>, ApiError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let rows = reachlog_db::list_campaigns(&state.pool, search, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CampaignItem::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

pub(super) async fn list_offers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let offers = reachlog_db::list_campaign_offers(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(offers, req_id.0))
}
