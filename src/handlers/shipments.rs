use super::common::{created, item_error_lines, ActorBody, StatusQuery};
use crate::{
    errors::ServiceError,
    models::{shipment, shipment_item::ShipmentItemType},
    services::shipments::{AddItems, CreateShipment, DispatchShipment, ItemsOutcome, LoadedItem},
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
pub struct RemoveItemQuery {
    pub item_type: Option<String>,
    pub actor: Option<String>,
}

pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Vec<shipment::Model>> {
    let shipments = state
        .services
        .shipments
        .list(query.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(shipments)))
}

pub async fn create_shipment(
    State(state): State<AppState>,
    Json(payload): Json<CreateShipment>,
) -> Result<(StatusCode, Json<ApiResponse<shipment::Model>>), ServiceError> {
    let shipment = state.services.shipments.create(payload).await?;
    Ok(created(shipment))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<shipment::Model> {
    let shipment = state.services.shipments.get(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn get_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<LoadedItem>> {
    let items = state.services.shipments.get_items(id).await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn add_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItems>,
) -> ApiResult<ItemsOutcome> {
    let outcome = state.services.shipments.add_items(id, payload).await?;
    let errors = item_error_lines(&outcome.errors);
    Ok(Json(ApiResponse::partial(outcome, errors)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<RemoveItemQuery>,
) -> ApiResult<shipment::Model> {
    let item_type = query
        .item_type
        .unwrap_or_else(|| ShipmentItemType::Container.to_string());
    let shipment = state
        .services
        .shipments
        .remove_item(id, &item_type, item_id, query.actor)
        .await?;
    Ok(Json(ApiResponse::with_message(shipment, "Item removed")))
}

pub async fn dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<DispatchShipment>>,
) -> ApiResult<shipment::Model> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let shipment = state.services.shipments.dispatch(id, input).await?;
    Ok(Json(ApiResponse::with_message(shipment, "Shipment dispatched")))
}

pub async fn mark_in_transit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ActorBody>>,
) -> ApiResult<shipment::Model> {
    let actor = body.and_then(|Json(b)| b.actor);
    let shipment = state.services.shipments.mark_in_transit(id, actor).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn receive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ActorBody>>,
) -> ApiResult<shipment::Model> {
    let actor = body.and_then(|Json(b)| b.actor);
    let shipment = state.services.shipments.receive(id, actor).await?;
    Ok(Json(ApiResponse::with_message(shipment, "Shipment received")))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ActorBody>>,
) -> ApiResult<shipment::Model> {
    let actor = body.and_then(|Json(b)| b.actor);
    let shipment = state.services.shipments.cancel(id, actor).await?;
    Ok(Json(ApiResponse::with_message(shipment, "Shipment cancelled")))
}
