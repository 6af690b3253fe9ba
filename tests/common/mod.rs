#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use ilms_api::{
    config::AppConfig,
    db, events,
    models::{container, inventory_item, location},
    services::{
        containers::CreateContainer,
        factory::{ServiceContainer, ServiceFactory},
        inventory::RegisterBatch,
        locations::CreateLocation,
        materials::CreateMaterial,
    },
    AppState,
};

pub const MATERIAL_CODE: &str = "MAT-001";

/// Application state backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub services: ServiceContainer,
    pub warehouse: location::Model,
    pub zone: location::Model,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // one connection keeps the in-memory database alive and shared
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.read_retry_initial_delay_ms = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc.clone(), cfg.clone(), event_sender.clone());
        let services = ServiceContainer::new(&ServiceFactory::new(db_arc, event_sender, &cfg));
        let router = ilms_api::app_router(state.clone());

        let warehouse = services
            .locations
            .create(CreateLocation {
                code: "WH-MAIN".into(),
                name: "Main Warehouse".into(),
                location_type: "WAREHOUSE".into(),
                ..Default::default()
            })
            .await
            .expect("seed warehouse");
        let zone = services
            .locations
            .create(CreateLocation {
                code: "ZN-A".into(),
                name: "Zone A".into(),
                location_type: "ZONE".into(),
                parent_id: Some(warehouse.id),
                ..Default::default()
            })
            .await
            .expect("seed zone");
        services
            .materials
            .create(CreateMaterial {
                code: MATERIAL_CODE.into(),
                name: "Test material".into(),
                base_uom: "EA".into(),
                is_serial_managed: true,
                ..Default::default()
            })
            .await
            .expect("seed material");

        Self {
            router,
            state,
            services,
            warehouse,
            zone,
            _event_task: event_task,
        }
    }

    /// Registers `n` serialized items at the warehouse.
    pub async fn register_items(&self, n: u32) -> Vec<inventory_item::Model> {
        self.services
            .inventory
            .register_batch(RegisterBatch {
                material_code: MATERIAL_CODE.into(),
                batch_number: Some("B-TEST".into()),
                quantity: n,
                location_id: Some(self.warehouse.id),
                actor: Some("tester".into()),
            })
            .await
            .expect("register items")
    }

    pub async fn create_container(
        &self,
        container_type: &str,
        capacity: Option<i32>,
    ) -> container::Model {
        self.services
            .containers
            .create(CreateContainer {
                container_type: container_type.into(),
                capacity,
                packaging_level_id: None,
                location_id: self.warehouse.id,
                created_by: Some("tester".into()),
            })
            .await
            .expect("create container")
    }

    /// A sealed box holding one freshly registered item.
    pub async fn sealed_box(&self) -> container::Model {
        let boxed = self.create_container("BOX", Some(10)).await;
        let items = self.register_items(1).await;
        let outcome = self
            .services
            .containers
            .pack(boxed.id, "INVENTORY", vec![items[0].id], None)
            .await
            .expect("pack");
        assert!(outcome.success);
        self.services
            .containers
            .seal(boxed.id, None)
            .await
            .expect("seal")
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn id_of(value: &Value) -> Uuid {
    value["data"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("response carries data.id")
}
