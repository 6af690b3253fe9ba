//! ILMS API Library
//!
//! Warehouse and logistics tracking: locations, materials, packaging
//! hierarchies, label templates, serialized inventory, container aggregation,
//! shipments and the trace history that ties them together.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod labels;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use services::idempotency::IdempotencyService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let factory =
            services::factory::ServiceFactory::new(db.clone(), event_sender.clone(), &config);
        Self {
            services: handlers::AppServices::new(&factory),
            db,
            config,
            event_sender,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    /// Partial success of a batch: data is returned alongside the per-item
    /// failures.
    pub fn partial(data: T, errors: Vec<String>) -> Self {
        Self {
            success: errors.is_empty(),
            errors: if errors.is_empty() { None } else { Some(errors) },
            ..Self::success(data)
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes(idempotency: IdempotencyService) -> Router<AppState> {
    use axum::routing::{delete, put};
    use handlers::{
        containers, definitions, inventory, label_templates, locations, materials, packaging,
        shipments, trace,
    };

    let reference = Router::new()
        .route(
            "/definitions",
            get(definitions::list_definitions).post(definitions::create_definition),
        )
        .route("/definitions/:id", delete(definitions::delete_definition))
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route("/locations/warehouses", get(locations::list_warehouses))
        .route("/locations/roots", get(locations::list_roots))
        .route(
            "/locations/:code",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/locations/:code/children", get(locations::get_children))
        .route(
            "/materials",
            get(materials::list_materials).post(materials::create_material),
        )
        .route(
            "/materials/:code",
            get(materials::get_material)
                .put(materials::update_material)
                .delete(materials::delete_material),
        );

    let labelling = Router::new()
        .route(
            "/packaging/hierarchies",
            get(packaging::list_hierarchies).post(packaging::create_hierarchy),
        )
        .route("/packaging/hierarchies/:id/levels", get(packaging::get_levels))
        .route(
            "/packaging/hierarchies/:id/label-plan",
            get(packaging::plan_label_counts),
        )
        .route("/packaging/levels", post(packaging::create_level))
        .route(
            "/packaging/levels/:id",
            put(packaging::update_level).delete(packaging::delete_level),
        )
        .route("/packaging/levels/:id/template", post(packaging::link_template))
        .route(
            "/label-templates",
            get(label_templates::list_templates).post(label_templates::create_template),
        )
        .route(
            "/label-templates/:id",
            get(label_templates::get_template)
                .put(label_templates::update_template)
                .delete(label_templates::delete_template),
        )
        .route("/label-templates/:id/render", post(label_templates::render_template))
        .route(
            "/label-templates/:id/placeholders",
            get(label_templates::get_placeholders),
        )
        .route("/label-templates/:id/imposition", get(label_templates::impose_template));

    let inventory_routes = Router::new()
        .route("/inventory", get(inventory::list_inventory))
        .route("/inventory/register", post(inventory::register_batch))
        .route("/inventory/pre-register", post(inventory::pre_register))
        .route("/inventory/scan", post(inventory::confirm_scan))
        .route("/inventory/:serial", get(inventory::get_by_serial))
        .route("/inventory/:serial/void", post(inventory::void_item));

    // Retried by scanners and handhelds, so keyed POSTs replay their first result.
    let movement = Router::new()
        .route(
            "/containers",
            get(containers::list_containers).post(containers::create_container),
        )
        .route("/containers/by-serial/:serial", get(containers::get_by_serial))
        .route("/containers/:id", get(containers::get_container))
        .route("/containers/:id/contents", get(containers::get_contents))
        .route("/containers/:id/pack", post(containers::pack))
        .route("/containers/:id/unpack", post(containers::unpack))
        .route("/containers/:id/seal", post(containers::seal))
        .route(
            "/shipments",
            get(shipments::list_shipments).post(shipments::create_shipment),
        )
        .route("/shipments/:id", get(shipments::get_shipment))
        .route(
            "/shipments/:id/items",
            get(shipments::get_items).post(shipments::add_items),
        )
        .route("/shipments/:id/items/:item_id", delete(shipments::remove_item))
        .route("/shipments/:id/dispatch", post(shipments::dispatch))
        .route("/shipments/:id/in-transit", post(shipments::mark_in_transit))
        .route("/shipments/:id/receive", post(shipments::receive))
        .route("/shipments/:id/cancel", post(shipments::cancel))
        .route_layer(from_fn_with_state(
            idempotency,
            middleware_helpers::idempotency_middleware,
        ));

    Router::new()
        .merge(reference)
        .merge(labelling)
        .merge(inventory_routes)
        .merge(movement)
        .route("/trace/:subject", get(trace::get_history))
}

/// Full application router without the outer tower layers.
pub fn app_router(state: AppState) -> Router {
    let idempotency = state.services.idempotency.clone();
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes(idempotency))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    Json(json!({
        "status": if database == "up" { "ok" } else { "degraded" },
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[test]
    fn partial_response_reports_item_errors() {
        let response = ApiResponse::partial(3, vec!["BOX-1: sealed".into()]);
        assert!(!response.success);
        assert_eq!(response.data, Some(3));
        assert_eq!(response.errors.as_ref().map(Vec::len), Some(1));

        let clean = ApiResponse::partial(3, Vec::new());
        assert!(clean.success);
        assert!(clean.errors.is_none());
    }
}
