use axum::{extract::State, Extension};

use crate::api::ApiResponse;
use crate::auth::AdminProfile;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/auth/me
///
/// The directory is re-consulted so a revoked admin stops resolving even
/// while their token is still within its expiry window.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<AdminProfile>, ApiError> {
    let admin = state
        .admins
        .find_by_id(&user.id)
        .ok_or_else(|| ApiError::unauthorized("Admin account no longer exists"))?;
    Ok(ApiResponse::success(AdminProfile::from(admin)))
}
