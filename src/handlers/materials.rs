use super::common::created;
use crate::{
    errors::ServiceError,
    models::material,
    services::materials::{CreateMaterial, UpdateMaterial},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

pub async fn list_materials(State(state): State<AppState>) -> ApiResult<Vec<material::Model>> {
    let materials = state.services.materials.list().await?;
    Ok(Json(ApiResponse::success(materials)))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<material::Model> {
    let material = state.services.materials.get(&code).await?;
    Ok(Json(ApiResponse::success(material)))
}

pub async fn create_material(
    State(state): State<AppState>,
    Json(payload): Json<CreateMaterial>,
) -> Result<(StatusCode, Json<ApiResponse<material::Model>>), ServiceError> {
    let material = state.services.materials.create(payload).await?;
    Ok(created(material))
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<UpdateMaterial>,
) -> ApiResult<material::Model> {
    let material = state.services.materials.update(&code, payload).await?;
    Ok(Json(ApiResponse::with_message(material, "Material updated")))
}

pub async fn delete_material(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.services.materials.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}
