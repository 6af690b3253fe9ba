use super::common::created;
use crate::{
    errors::ServiceError,
    labels::{render::data_from_json, Imposition, PaperSize, RenderedLabel},
    models::label_template,
    services::label_templates::{CreateTemplate, UpdateTemplate},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ImpositionQuery {
    #[serde(default = "default_paper")]
    pub paper: String,
    pub total: u32,
}

fn default_paper() -> String {
    PaperSize::A4.to_string()
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> ApiResult<Vec<label_template::Model>> {
    let templates = state.services.label_templates.list().await?;
    Ok(Json(ApiResponse::success(templates)))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<label_template::Model> {
    let template = state.services.label_templates.get(id).await?;
    Ok(Json(ApiResponse::success(template)))
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplate>,
) -> Result<(StatusCode, Json<ApiResponse<label_template::Model>>), ServiceError> {
    let template = state.services.label_templates.create(payload).await?;
    Ok(created(template))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplate>,
) -> ApiResult<label_template::Model> {
    let template = state.services.label_templates.update(id, payload).await?;
    Ok(Json(ApiResponse::with_message(template, "Template saved")))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.label_templates.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Renders the template against a flat JSON object of print data.
pub async fn render_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<Value>,
) -> ApiResult<RenderedLabel> {
    if !(data.is_object() || data.is_null()) {
        return Err(ServiceError::invalid(
            "Print data must be a JSON object of placeholder values",
        ));
    }
    let label = state
        .services
        .label_templates
        .render(id, &data_from_json(&data))
        .await?;
    Ok(Json(ApiResponse::success(label)))
}

pub async fn get_placeholders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<String>> {
    let keys = state.services.label_templates.placeholders(id).await?;
    Ok(Json(ApiResponse::success(keys)))
}

pub async fn impose_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ImpositionQuery>,
) -> ApiResult<Imposition> {
    let paper = PaperSize::from_str(query.paper.trim()).map_err(|_| {
        ServiceError::validation("paper", format!("Unknown paper size '{}'", query.paper))
    })?;
    let layout = state
        .services
        .label_templates
        .impose(id, paper, query.total)
        .await?;
    Ok(Json(ApiResponse::success(layout)))
}
