use axum::extract::State;

use crate::api::ApiResponse;
use crate::state::AppState;
use crate::tenant::TenantSummary;

/// GET /api/apps — every registered app, without connection details.
pub async fn list(State(state): State<AppState>) -> ApiResponse<Vec<TenantSummary>> {
    ApiResponse::success(state.registry.list_all())
}
