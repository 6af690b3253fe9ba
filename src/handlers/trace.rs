use crate::{models::trace_event, ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
};

/// History of a serial, container or shipment number, or a raw subject id,
/// newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> ApiResult<Vec<trace_event::Model>> {
    let events = state.services.trace.get_history(&subject).await?;
    Ok(Json(ApiResponse::success(events)))
}
