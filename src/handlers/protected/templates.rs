use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiResponse, Page};
use crate::error::ApiError;
use crate::middleware::{AuthUser, CurrentTenant};
use crate::services::templates::{
    CategoryCount, CreateTemplate, EmailTemplate, EmailTemplateSummary, TemplateListParams,
    UpdateTemplate,
};
use crate::services::TemplatesService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoriesQuery {
    pub shop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveToggle {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DuplicateRequest {
    pub slug: Option<String>,
}

fn template_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Template \"{}\" not found", id))
}

/// GET /api/apps/:app_id/templates
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(params): Query<TemplateListParams>,
) -> Result<ApiResponse<Page<EmailTemplateSummary>>, ApiError> {
    let page = TemplatesService::new(state.databases.clone())
        .list(&tenant.id, &params)
        .await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/apps/:app_id/templates/categories
pub async fn categories(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Query(query): Query<CategoriesQuery>,
) -> Result<ApiResponse<Vec<CategoryCount>>, ApiError> {
    let counts = TemplatesService::new(state.databases.clone())
        .categories(&tenant.id, query.shop.as_deref())
        .await?;
    Ok(ApiResponse::success(counts))
}

/// GET /api/apps/:app_id/templates/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Path((_, template_id)): Path<(String, Uuid)>,
) -> Result<ApiResponse<EmailTemplate>, ApiError> {
    let template = TemplatesService::new(state.databases.clone())
        .get_by_id(&tenant.id, template_id)
        .await?
        .ok_or_else(|| template_not_found(template_id))?;
    Ok(ApiResponse::success(template))
}

/// POST /api/apps/:app_id/templates
pub async fn create(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<CreateTemplate>,
) -> Result<ApiResponse<EmailTemplate>, ApiError> {
    if body.name.trim().is_empty() || body.slug.trim().is_empty() {
        return Err(ApiError::bad_request("Template name and slug are required"));
    }
    if body.subject.trim().is_empty() || body.html_content.trim().is_empty() {
        return Err(ApiError::bad_request("Template subject and html_content are required"));
    }

    let template = TemplatesService::new(state.databases.clone())
        .create(&tenant.id, &body, &admin.id)
        .await?;
    Ok(ApiResponse::created(template))
}

/// PATCH /api/apps/:app_id/templates/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Extension(admin): Extension<AuthUser>,
    Path((_, template_id)): Path<(String, Uuid)>,
    Json(body): Json<UpdateTemplate>,
) -> Result<ApiResponse<EmailTemplate>, ApiError> {
    let template = TemplatesService::new(state.databases.clone())
        .update(&tenant.id, template_id, &body, &admin.id)
        .await?
        .ok_or_else(|| template_not_found(template_id))?;
    Ok(ApiResponse::success(template))
}

/// PATCH /api/apps/:app_id/templates/:id/active
pub async fn toggle_active(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Extension(admin): Extension<AuthUser>,
    Path((_, template_id)): Path<(String, Uuid)>,
    Json(body): Json<ActiveToggle>,
) -> Result<ApiResponse<EmailTemplate>, ApiError> {
    let template = TemplatesService::new(state.databases.clone())
        .toggle_active(&tenant.id, template_id, body.is_active, &admin.id)
        .await?
        .ok_or_else(|| template_not_found(template_id))?;
    Ok(ApiResponse::success(template))
}

/// POST /api/apps/:app_id/templates/:id/duplicate
pub async fn duplicate(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Extension(admin): Extension<AuthUser>,
    Path((_, template_id)): Path<(String, Uuid)>,
    body: Option<Json<DuplicateRequest>>,
) -> Result<ApiResponse<EmailTemplate>, ApiError> {
    let slug = body.as_ref().and_then(|Json(b)| b.slug.clone());
    let template = TemplatesService::new(state.databases.clone())
        .duplicate(&tenant.id, template_id, slug.as_deref(), &admin.id)
        .await?
        .ok_or_else(|| template_not_found(template_id))?;
    Ok(ApiResponse::created(template))
}

/// DELETE /api/apps/:app_id/templates/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(tenant): Extension<CurrentTenant>,
    Path((_, template_id)): Path<(String, Uuid)>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let deleted = TemplatesService::new(state.databases.clone())
        .delete(&tenant.id, template_id)
        .await?;
    if !deleted {
        return Err(template_not_found(template_id));
    }
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}
