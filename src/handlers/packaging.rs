use super::common::created;
use crate::{
    errors::ServiceError,
    labels::LevelLabelCount,
    models::{packaging_hierarchy, packaging_level},
    services::packaging::{CreateHierarchy, CreateLevel, HierarchyWithLevels, UpdateLevel},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LabelPlanQuery {
    /// Innermost units to be packed
    pub total_items: i64,
}

#[derive(Debug, Deserialize)]
pub struct LinkTemplateRequest {
    pub template_id: Uuid,
}

pub async fn list_hierarchies(
    State(state): State<AppState>,
) -> ApiResult<Vec<HierarchyWithLevels>> {
    let hierarchies = state.services.packaging.get_hierarchies().await?;
    Ok(Json(ApiResponse::success(hierarchies)))
}

pub async fn create_hierarchy(
    State(state): State<AppState>,
    Json(payload): Json<CreateHierarchy>,
) -> Result<(StatusCode, Json<ApiResponse<packaging_hierarchy::Model>>), ServiceError> {
    let hierarchy = state.services.packaging.create_hierarchy(payload).await?;
    Ok(created(hierarchy))
}

pub async fn get_levels(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<packaging_level::Model>> {
    let levels = state.services.packaging.get_levels(id).await?;
    Ok(Json(ApiResponse::success(levels)))
}

pub async fn create_level(
    State(state): State<AppState>,
    Json(payload): Json<CreateLevel>,
) -> Result<(StatusCode, Json<ApiResponse<packaging_level::Model>>), ServiceError> {
    let level = state.services.packaging.create_level(payload).await?;
    Ok(created(level))
}

pub async fn update_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLevel>,
) -> ApiResult<packaging_level::Model> {
    let level = state.services.packaging.update_level(id, payload).await?;
    Ok(Json(ApiResponse::success(level)))
}

pub async fn delete_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.packaging.delete_level(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn link_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkTemplateRequest>,
) -> ApiResult<packaging_level::Model> {
    let level = state
        .services
        .packaging
        .link_template(id, payload.template_id)
        .await?;
    Ok(Json(ApiResponse::with_message(level, "Label template linked")))
}

pub async fn plan_label_counts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LabelPlanQuery>,
) -> ApiResult<Vec<LevelLabelCount>> {
    let plan = state
        .services
        .packaging
        .plan_label_counts(id, query.total_items)
        .await?;
    Ok(Json(ApiResponse::success(plan)))
}
