//! Report handlers. Every report is recomputed from the snapshot log on request.
//!
//! - `GET /api/v1/reports/campaigns/{id}`: summary plus per-account results
//! - `GET /api/v1/reports/period`: fold over campaigns in a date range
//! - `GET /api/v1/reports/clients/{code}`: fold over one client's campaigns
//! - `GET /api/v1/reports/warmup`: rest-day bracket statistics

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use reachlog_core::{
    select_range, AggregateReport, CampaignReport, DateRange, ReportPeriod, WarmupBracketStats,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::campaigns::CampaignItem;
use super::{map_db_error, validation_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ReportQuery {
    pub period: Option<ReportPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportQuery {
    fn range(&self, req_id: &str, today: NaiveDate) -> Result<Option<DateRange>, ApiError> {
        select_range(self.period, self.start_date, self.end_date, today)
            .map_err(|e| validation_error(req_id, &e))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignReportItem {
    pub campaign: CampaignItem,
    #[serde(flatten)]
    pub report: CampaignReport,
}

#[derive(Debug, Serialize)]
pub(super) struct PeriodReportItem {
    pub range: DateRange,
    #[serde(flatten)]
    pub report: AggregateReport,
}

#[derive(Debug, Serialize)]
pub(super) struct ClientReportItem {
    pub client_code: String,
    pub range: Option<DateRange>,
    #[serde(flatten)]
    pub report: AggregateReport,
}

pub(super) async fn campaign_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CampaignReportItem>>, ApiError> {
    let campaign = reachlog_db::get_campaign_by_id(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let report = reachlog_db::compute_campaign_stats(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        CampaignReportItem {
            campaign: CampaignItem::from(campaign),
            report,
        },
        req_id.0,
    ))
}

pub(super) async fn period_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ApiResponse<PeriodReportItem>>, ApiError> {
    let today = Utc::now().date_naive();
    let range = query
        .range(&req_id.0, today)?
        .unwrap_or_else(|| ReportPeriod::Today.resolve(today));

    let campaigns = reachlog_db::list_campaigns_in_range(&state.pool, range)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let report = reachlog_db::aggregate_campaigns(&state.pool, &campaigns)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        start = %range.start(),
        end = %range.end(),
        campaigns = campaigns.len(),
        "period report computed"
    );
    Ok(ApiResponse::new(PeriodReportItem { range, report }, req_id.0))
}

pub(super) async fn client_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(code): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ApiResponse<ClientReportItem>>, ApiError> {
    let range = query.range(&req_id.0, Utc::now().date_naive())?;

    let campaigns = reachlog_db::list_campaigns_by_client(&state.pool, &code, range)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if campaigns.is_empty() && !client_exists(&state, &req_id.0, &code, range).await? {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no campaigns found for client '{code}'"),
        ));
    }

    let report = reachlog_db::aggregate_campaigns(&state.pool, &campaigns)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        ClientReportItem {
            client_code: code,
            range,
            report,
        },
        req_id.0,
    ))
}

// An empty selection only means an unknown client when no range narrowed it.
async fn client_exists(
    state: &AppState,
    req_id: &str,
    code: &str,
    range: Option<DateRange>,
) -> Result<bool, ApiError> {
    if range.is_none() {
        return Ok(false);
    }
    let codes = reachlog_db::list_client_codes(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.to_string(), &e))?;
    Ok(codes.iter().any(|c| c == code))
}

pub(super) async fn warmup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<WarmupBracketStats>>>, ApiError> {
    let brackets = reachlog_db::warmup_report(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(brackets, req_id.0))
}
