use axum::extract::{Query, State};
use serde::Deserialize;

use crate::api::ApiResponse;
use crate::services::aggregate::{AggregateDashboard, AggregateTopShops, AggregateUsersOverTime};
use crate::services::AggregateService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// GET /api/metrics/aggregate/dashboard
///
/// Always returns 200: apps whose databases are down appear as error slices
/// rather than failing the whole response.
pub async fn dashboard(State(state): State<AppState>) -> ApiResponse<AggregateDashboard> {
    let report = AggregateService::new(state.databases.clone()).dashboard().await;
    ApiResponse::success(report)
}

/// GET /api/metrics/aggregate/users-over-time
pub async fn users_over_time(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> ApiResponse<AggregateUsersOverTime> {
    let report = AggregateService::new(state.databases.clone())
        .users_over_time(query.days.unwrap_or(30))
        .await;
    ApiResponse::success(report)
}

/// GET /api/metrics/aggregate/top-shops
pub async fn top_shops(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResponse<AggregateTopShops> {
    let report = AggregateService::new(state.databases.clone())
        .top_shops(query.limit.unwrap_or(10))
        .await;
    ApiResponse::success(report)
}
