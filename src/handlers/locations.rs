use super::common::created;
use crate::{
    errors::ServiceError,
    models::location,
    services::locations::{CreateLocation, UpdateLocation},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Vec<location::Model>> {
    let locations = state.services.locations.list().await?;
    Ok(Json(ApiResponse::success(locations)))
}

pub async fn list_warehouses(State(state): State<AppState>) -> ApiResult<Vec<location::Model>> {
    let warehouses = state.services.locations.list_warehouses().await?;
    Ok(Json(ApiResponse::success(warehouses)))
}

/// Locations without a parent.
pub async fn list_roots(State(state): State<AppState>) -> ApiResult<Vec<location::Model>> {
    let roots = state.services.locations.get_children(None).await?;
    Ok(Json(ApiResponse::success(roots)))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<location::Model> {
    let location = state.services.locations.get(&code).await?;
    Ok(Json(ApiResponse::success(location)))
}

pub async fn get_children(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Vec<location::Model>> {
    let parent = state.services.locations.get(&code).await?;
    let children = state.services.locations.get_children(Some(parent.id)).await?;
    Ok(Json(ApiResponse::success(children)))
}

pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocation>,
) -> Result<(StatusCode, Json<ApiResponse<location::Model>>), ServiceError> {
    let location = state.services.locations.create(payload).await?;
    Ok(created(location))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<UpdateLocation>,
) -> ApiResult<location::Model> {
    let location = state.services.locations.update(&code, payload).await?;
    Ok(Json(ApiResponse::with_message(location, "Location updated")))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.services.locations.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}
