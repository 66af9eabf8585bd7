use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::ApiResponse;
use crate::auth::{AdminProfile, AuthError};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminProfile,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let (token, user) = state
        .admins
        .login(&body.email, &body.password, &state.config.security)
        .map_err(|err| match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid email or password"),
            other => {
                tracing::error!(error = %other, "Login token generation failed");
                ApiError::internal_server_error("Authentication is unavailable")
            }
        })?;

    tracing::info!(admin = %user.email, "Admin logged in");
    Ok(ApiResponse::success(LoginResponse { token, user }))
}
