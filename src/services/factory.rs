use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    middleware_helpers::retry::RetryConfig,
    services::{
        containers::ContainerService, definitions::DefinitionService,
        idempotency::IdempotencyService, inventory::InventoryService,
        label_templates::LabelTemplateService, locations::LocationService,
        materials::MaterialService, packaging::PackagingService, serials::SerialGenerator,
        shipments::ShipmentService, trace::TraceService,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    retry: RetryConfig,
    serials: SerialGenerator,
    idempotency_ttl: std::time::Duration,
}

impl ServiceFactory {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        Self {
            db_pool,
            event_sender: Arc::new(event_sender),
            retry: RetryConfig::from(config),
            serials: SerialGenerator::new(config.gs1_company_prefix.clone()),
            idempotency_ttl: config.idempotency_ttl(),
        }
    }

    pub fn definitions(&self) -> DefinitionService {
        DefinitionService::new(self.db_pool.clone(), self.retry.clone())
    }

    pub fn locations(&self) -> LocationService {
        LocationService::new(self.db_pool.clone(), self.retry.clone())
    }

    pub fn materials(&self) -> MaterialService {
        MaterialService::new(self.db_pool.clone(), self.retry.clone())
    }

    pub fn packaging(&self) -> PackagingService {
        PackagingService::new(self.db_pool.clone(), self.retry.clone())
    }

    pub fn label_templates(&self) -> LabelTemplateService {
        LabelTemplateService::new(self.db_pool.clone(), self.retry.clone())
    }

    pub fn inventory(&self) -> InventoryService {
        InventoryService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.serials.clone(),
            self.retry.clone(),
        )
    }

    pub fn containers(&self) -> ContainerService {
        ContainerService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.serials.clone(),
            self.retry.clone(),
        )
    }

    pub fn shipments(&self) -> ShipmentService {
        ShipmentService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.serials.clone(),
            self.retry.clone(),
        )
    }

    pub fn trace(&self) -> TraceService {
        TraceService::new(self.db_pool.clone(), self.retry.clone())
    }

    pub fn idempotency(&self) -> IdempotencyService {
        IdempotencyService::new(self.db_pool.clone(), self.idempotency_ttl)
    }

    /// Gets a reference to the database pool
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub definitions: Arc<DefinitionService>,
    pub locations: Arc<LocationService>,
    pub materials: Arc<MaterialService>,
    pub packaging: Arc<PackagingService>,
    pub label_templates: Arc<LabelTemplateService>,
    pub inventory: Arc<InventoryService>,
    pub containers: Arc<ContainerService>,
    pub shipments: Arc<ShipmentService>,
    pub trace: Arc<TraceService>,
    pub idempotency: IdempotencyService,
}

impl ServiceContainer {
    /// Creates a new service container with all services initialized
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            definitions: Arc::new(factory.definitions()),
            locations: Arc::new(factory.locations()),
            materials: Arc::new(factory.materials()),
            packaging: Arc::new(factory.packaging()),
            label_templates: Arc::new(factory.label_templates()),
            inventory: Arc::new(factory.inventory()),
            containers: Arc::new(factory.containers()),
            shipments: Arc::new(factory.shipments()),
            trace: Arc::new(factory.trace()),
            idempotency: factory.idempotency(),
        }
    }
}
