use crate::{services::ItemError, ApiResponse};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Standard created response
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Body accepted by transitions that only record who performed them.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ActorBody {
    pub actor: Option<String>,
}

/// Optional status filter for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// One line per rejected item, for the `errors` field of the envelope.
pub fn item_error_lines(errors: &[ItemError]) -> Vec<String> {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.item_id, e.message))
        .collect()
}
