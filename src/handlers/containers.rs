use super::common::{created, item_error_lines, ActorBody, StatusQuery};
use crate::{
    errors::ServiceError,
    models::container,
    services::containers::{ContentEntry, CreateContainer, PackOutcome, PackRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

pub async fn list_containers(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Vec<container::Model>> {
    let containers = state
        .services
        .containers
        .list(query.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(containers)))
}

pub async fn create_container(
    State(state): State<AppState>,
    Json(payload): Json<CreateContainer>,
) -> Result<(StatusCode, Json<ApiResponse<container::Model>>), ServiceError> {
    let container = state.services.containers.create(payload).await?;
    Ok(created(container))
}

pub async fn get_container(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<container::Model> {
    let container = state.services.containers.get(id).await?;
    Ok(Json(ApiResponse::success(container)))
}

pub async fn get_by_serial(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> ApiResult<container::Model> {
    let container = state.services.containers.get_by_serial(&serial).await?;
    Ok(Json(ApiResponse::success(container)))
}

pub async fn get_contents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ContentEntry>> {
    let contents = state.services.containers.get_contents(id).await?;
    Ok(Json(ApiResponse::success(contents)))
}

/// Packs children one by one; the envelope lists any child that was refused.
pub async fn pack(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PackRequest>,
) -> ApiResult<PackOutcome> {
    let outcome = state
        .services
        .containers
        .pack(id, &payload.child_type, payload.child_ids, payload.actor)
        .await?;
    let errors = item_error_lines(&outcome.errors);
    Ok(Json(ApiResponse::partial(outcome, errors)))
}

pub async fn unpack(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PackRequest>,
) -> ApiResult<PackOutcome> {
    let outcome = state
        .services
        .containers
        .unpack(id, &payload.child_type, payload.child_ids, payload.actor)
        .await?;
    let errors = item_error_lines(&outcome.errors);
    Ok(Json(ApiResponse::partial(outcome, errors)))
}

pub async fn seal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ActorBody>>,
) -> ApiResult<container::Model> {
    let actor = body.and_then(|Json(b)| b.actor);
    let container = state.services.containers.seal(id, actor).await?;
    Ok(Json(ApiResponse::with_message(container, "Container sealed")))
}
