use super::common::created;
use crate::{
    errors::ServiceError, models::definition, services::definitions::CreateDefinition,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct DefinitionQuery {
    /// Restrict to one definition type, e.g. `LOCATION_TYPE`
    pub def_type: Option<String>,
}

pub async fn list_definitions(
    State(state): State<AppState>,
    Query(query): Query<DefinitionQuery>,
) -> ApiResult<Vec<definition::Model>> {
    let definitions = state
        .services
        .definitions
        .list(query.def_type.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(definitions)))
}

pub async fn create_definition(
    State(state): State<AppState>,
    Json(payload): Json<CreateDefinition>,
) -> Result<(StatusCode, Json<ApiResponse<definition::Model>>), ServiceError> {
    let definition = state.services.definitions.create(payload).await?;
    Ok(created(definition))
}

pub async fn delete_definition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.definitions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
