use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use crate::api::ApiResponse;
use crate::error::ApiError;
use crate::middleware::CurrentTenant;
use crate::services::metrics::{
    ActivityEntry, DailyCount, Dashboard, MetricEvent, MetricEventParams, ShopUserCount,
};
use crate::services::MetricsService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// GET /api/apps/:app_id/metrics/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
) -> Result<ApiResponse<Dashboard>, ApiError> {
    let dashboard = MetricsService::new(state.databases.clone())
        .dashboard(&tenant.id)
        .await?;
    Ok(ApiResponse::success(dashboard))
}

/// GET /api/apps/:app_id/metrics/users-over-time
pub async fn users_over_time(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(query): Query<DaysQuery>,
) -> Result<ApiResponse<Vec<DailyCount>>, ApiError> {
    let series = MetricsService::new(state.databases.clone())
        .users_over_time(&tenant.id, query.days.unwrap_or(30))
        .await?;
    Ok(ApiResponse::success(series))
}

/// GET /api/apps/:app_id/metrics/top-shops
pub async fn top_shops(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(query): Query<LimitQuery>,
) -> Result<ApiResponse<Vec<ShopUserCount>>, ApiError> {
    let shops = MetricsService::new(state.databases.clone())
        .top_shops(&tenant.id, query.limit.unwrap_or(10))
        .await?;
    Ok(ApiResponse::success(shops))
}

/// GET /api/apps/:app_id/metrics/recent-activity
pub async fn recent_activity(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(query): Query<LimitQuery>,
) -> Result<ApiResponse<Vec<ActivityEntry>>, ApiError> {
    let activity = MetricsService::new(state.databases.clone())
        .recent_activity(&tenant.id, query.limit.unwrap_or(20))
        .await?;
    Ok(ApiResponse::success(activity))
}

/// GET /api/apps/:app_id/metrics/events
pub async fn events(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(params): Query<MetricEventParams>,
) -> Result<ApiResponse<Vec<MetricEvent>>, ApiError> {
    let events = MetricsService::new(state.databases.clone())
        .events(&tenant.id, &params)
        .await?;
    Ok(ApiResponse::success(events))
}
