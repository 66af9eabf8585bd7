use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiResponse, Page};
use crate::error::ApiError;
use crate::middleware::CurrentTenant;
use crate::services::users::{AppUser, UpdateUser, UserListParams, UserStats};
use crate::services::UsersService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub shop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// GET /api/apps/:app_id/users
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(params): Query<UserListParams>,
) -> Result<ApiResponse<Page<AppUser>>, ApiError> {
    let page = UsersService::new(state.databases.clone())
        .list(&tenant.id, &params)
        .await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/apps/:app_id/users/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(query): Query<StatsQuery>,
) -> Result<ApiResponse<UserStats>, ApiError> {
    let stats = UsersService::new(state.databases.clone())
        .stats(&tenant.id, query.shop.as_deref())
        .await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/apps/:app_id/users/shops
pub async fn shops(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
) -> Result<ApiResponse<Vec<String>>, ApiError> {
    let shops = UsersService::new(state.databases.clone())
        .shops(&tenant.id)
        .await?;
    Ok(ApiResponse::success(shops))
}

/// GET /api/apps/:app_id/users/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Path((_, user_id)): Path<(String, Uuid)>,
) -> Result<ApiResponse<AppUser>, ApiError> {
    let user = UsersService::new(state.databases.clone())
        .get_by_id(&tenant.id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User \"{}\" not found", user_id)))?;
    Ok(ApiResponse::success(user))
}

/// PATCH /api/apps/:app_id/users/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Path((_, user_id)): Path<(String, Uuid)>,
    Json(body): Json<UpdateUser>,
) -> Result<ApiResponse<AppUser>, ApiError> {
    let user = UsersService::new(state.databases.clone())
        .update(&tenant.id, user_id, &body)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User \"{}\" not found", user_id)))?;
    Ok(ApiResponse::success(user))
}

/// PATCH /api/apps/:app_id/users/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Path((_, user_id)): Path<(String, Uuid)>,
    Json(body): Json<StatusUpdate>,
) -> Result<ApiResponse<AppUser>, ApiError> {
    let user = UsersService::new(state.databases.clone())
        .update_status(&tenant.id, user_id, &body.status)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User \"{}\" not found", user_id)))?;
    Ok(ApiResponse::success(user))
}
