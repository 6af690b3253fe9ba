use super::common::{created, ActorBody, StatusQuery};
use crate::{
    errors::ServiceError,
    models::inventory_item,
    services::inventory::{ConfirmScan, PreRegister, RegisterBatch},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Vec<inventory_item::Model>> {
    let items = state
        .services
        .inventory
        .list(query.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn get_by_serial(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> ApiResult<inventory_item::Model> {
    let item = state.services.inventory.get_by_serial(&serial).await?;
    Ok(Json(ApiResponse::success(item)))
}

pub async fn register_batch(
    State(state): State<AppState>,
    Json(payload): Json<RegisterBatch>,
) -> Created<Vec<inventory_item::Model>> {
    let items = state.services.inventory.register_batch(payload).await?;
    Ok(created(items))
}

pub async fn pre_register(
    State(state): State<AppState>,
    Json(payload): Json<PreRegister>,
) -> Created<Vec<inventory_item::Model>> {
    let items = state.services.inventory.pre_register(payload).await?;
    Ok(created(items))
}

/// Scanner endpoint: confirms a pre-registered label at a location.
pub async fn confirm_scan(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmScan>,
) -> ApiResult<inventory_item::Model> {
    let item = state.services.inventory.confirm_scan(payload).await?;
    Ok(Json(ApiResponse::with_message(item, "Scan confirmed")))
}

pub async fn void_item(
    State(state): State<AppState>,
    Path(serial): Path<String>,
    body: Option<Json<ActorBody>>,
) -> ApiResult<inventory_item::Model> {
    let actor = body.and_then(|Json(b)| b.actor);
    let item = state.services.inventory.void(&serial, actor).await?;
    Ok(Json(ApiResponse::with_message(item, "Item voided")))
}
