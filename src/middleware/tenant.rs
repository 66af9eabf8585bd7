use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;

use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::TenantSummary;

pub const APP_ID_HEADER: &str = "x-app-id";

/// The resolved app for this request, injected for downstream handlers.
#[derive(Clone, Debug)]
pub struct CurrentTenant {
    pub id: String,
    pub summary: TenantSummary,
}

/// Tenant-resolution hook for app-scoped routes.
///
/// Reads the app id from the `X-App-Id` header (primary) or the `:app_id`
/// path segment (fallback), validates it against the registry, establishes
/// the database connection lazily, and attaches both the tenant info and the
/// connection handle to the request.
pub async fn tenant_selector_middleware(
    State(state): State<AppState>,
    params: Option<Path<HashMap<String, String>>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let from_header = headers
        .get(APP_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let from_path = params.as_ref().and_then(|Path(p)| p.get("app_id").cloned());

    let tenant_id = from_header.or(from_path).ok_or_else(|| {
        ApiError::bad_request("App ID is required. Send it via X-App-Id header or :app_id path segment")
    })?;

    let descriptor = state
        .registry
        .resolve(&tenant_id)
        .ok_or_else(|| ApiError::not_found(format!("App \"{}\" not found", tenant_id)))?;

    let connection = match state.databases.get_connection(&tenant_id).await {
        Ok(connection) => connection,
        // In development, surface the real connect error to ease debugging;
        // everywhere else the translation layer returns a generic 503.
        Err(err @ DatabaseError::ConnectFailure { .. }) if state.config.is_development() => {
            return Err(ApiError::service_unavailable(err.to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(CurrentTenant {
        id: tenant_id,
        summary: TenantSummary::from(descriptor),
    });
    request.extensions_mut().insert(connection);

    Ok(next.run(request).await)
}
