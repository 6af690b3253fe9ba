use crate::{
    db::DbPool,
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
    middleware_helpers::retry::RetryConfig,
    models::{
        inventory_item::{self, InventoryStatus},
        location, material, parse_enum,
        trace_event::{SubjectType, TraceEventType},
    },
    services::{
        serials::{SerialGenerator, MAX_SERIAL_ATTEMPTS},
        trace::{self, TraceRecord},
    },
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterBatch {
    #[validate(length(min = 1, message = "Material code is required"))]
    pub material_code: String,
    pub batch_number: Option<String>,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: u32,
    pub location_id: Option<Uuid>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreRegister {
    #[validate(length(min = 1, message = "Material code is required"))]
    pub material_code: String,
    #[validate(length(min = 1, message = "At least one serial is required"))]
    pub serials: Vec<String>,
    pub batch_number: Option<String>,
}

/// Body of a scan confirmation. Fields are optional so that a missing value
/// is reported against its field name rather than as a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmScan {
    pub serial_number: Option<String>,
    pub location_id: Option<Uuid>,
    pub actor: Option<String>,
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    serials: SerialGenerator,
    retry: RetryConfig,
}

impl InventoryService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        serials: SerialGenerator,
        retry: RetryConfig,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            serials,
            retry,
        }
    }

    /// Creates `quantity` REGISTERED items with generated serials.
    #[instrument(skip(self, input), fields(material = %input.material_code, quantity = input.quantity))]
    pub async fn register_batch(
        &self,
        input: RegisterBatch,
    ) -> Result<Vec<inventory_item::Model>, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let material = find_material(db, &input.material_code).await?;
        let location_code = match input.location_id {
            Some(id) => Some(find_location(db, id).await?.code),
            None => None,
        };

        let txn = db.begin().await.map_err(ServiceError::db_error)?;
        let mut created = Vec::with_capacity(input.quantity as usize);
        for _ in 0..input.quantity {
            let mut saved = None;
            for attempt in 1..=MAX_SERIAL_ATTEMPTS {
                let now = Utc::now();
                let model = new_item(
                    material.id,
                    self.serials.inventory_serial(&material.code, now),
                    input.batch_number.clone(),
                    InventoryStatus::Registered,
                    input.location_id,
                );
                // savepoint, so a collision does not abort the batch
                let savepoint = txn.begin().await.map_err(ServiceError::db_error)?;
                match model.insert(&savepoint).await {
                    Ok(item) => {
                        savepoint.commit().await.map_err(ServiceError::db_error)?;
                        saved = Some(item);
                        break;
                    }
                    Err(e) if is_unique_violation(&e) => {
                        debug!(attempt, "Inventory serial collision, regenerating");
                    }
                    Err(e) => return Err(ServiceError::db_error(e)),
                }
            }
            let item = saved.ok_or_else(|| {
                ServiceError::InternalError("Could not generate a unique inventory serial".into())
            })?;

            trace::record(
                &txn,
                TraceRecord::new(
                    SubjectType::Inventory,
                    item.id,
                    item.serial_number.clone(),
                    TraceEventType::ItemCreated,
                )
                .location(location_code.clone())
                .actor(input.actor.clone()),
            )
            .await?;
            created.push(item);
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::counter!("ilms.inventory.registered", created.len() as u64);
        info!(material = %material.code, count = created.len(), "Inventory registered");
        self.event_sender
            .send_or_log(Event::InventoryRegistered {
                material_id: material.id,
                count: created.len(),
            })
            .await;
        Ok(created)
    }

    /// Records serials printed ahead of production; each waits in
    /// PRE_INVENTORY until its label is scanned.
    #[instrument(skip(self, input), fields(material = %input.material_code, serials = input.serials.len()))]
    pub async fn pre_register(
        &self,
        input: PreRegister,
    ) -> Result<Vec<inventory_item::Model>, ServiceError> {
        input.validate()?;
        let mut seen = HashSet::new();
        for serial in &input.serials {
            let serial = serial.trim();
            if serial.is_empty() {
                return Err(ServiceError::validation("serials", "Serials must not be blank"));
            }
            if !seen.insert(serial.to_string()) {
                return Err(ServiceError::validation(
                    "serials",
                    format!("Serial {} appears more than once", serial),
                ));
            }
        }

        let db = &*self.db_pool;
        let material = find_material(db, &input.material_code).await?;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;
        let mut created = Vec::with_capacity(input.serials.len());
        for serial in &input.serials {
            let serial = serial.trim().to_string();
            let model = new_item(
                material.id,
                serial.clone(),
                input.batch_number.clone(),
                InventoryStatus::PreInventory,
                None,
            );
            let item = model.insert(&txn).await.map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::conflict(
                        "inventory item",
                        None,
                        "pre-register",
                        format!("Serial {} is already registered", serial),
                    )
                } else {
                    ServiceError::db_error(e)
                }
            })?;
            trace::record(
                &txn,
                TraceRecord::new(
                    SubjectType::Inventory,
                    item.id,
                    item.serial_number.clone(),
                    TraceEventType::ItemCreated,
                )
                .notes("Pre-registered"),
            )
            .await?;
            created.push(item);
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(material = %material.code, count = created.len(), "Serials pre-registered");
        Ok(created)
    }

    /// Moves a pre-registered item to ACTIVE at the scanning location.
    #[instrument(skip(self, input))]
    pub async fn confirm_scan(
        &self,
        input: ConfirmScan,
    ) -> Result<inventory_item::Model, ServiceError> {
        let serial = input
            .serial_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::validation("serial_number", "Scan a label serial first"))?;
        let location_id = input.location_id.ok_or_else(|| {
            ServiceError::validation("location_id", "Select a location before scanning")
        })?;

        let db = &*self.db_pool;
        let location = find_location(db, location_id).await?;

        let txn = db.begin().await.map_err(ServiceError::db_error)?;
        let now = Utc::now();
        let result = inventory_item::Entity::update_many()
            .col_expr(
                inventory_item::Column::Status,
                Expr::value(InventoryStatus::Active.to_value()),
            )
            .col_expr(inventory_item::Column::LocationId, Expr::value(Some(location_id)))
            .col_expr(
                inventory_item::Column::Version,
                Expr::col(inventory_item::Column::Version).add(1),
            )
            .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_item::Column::SerialNumber.eq(serial))
            .filter(inventory_item::Column::Status.eq(InventoryStatus::PreInventory))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let item = find_by_serial(&txn, serial).await?;
        if result.rows_affected == 0 {
            let message = match item.status {
                InventoryStatus::Active => format!("Item {} is already confirmed", serial),
                InventoryStatus::Voided => format!("Item {} has been voided", serial),
                other => format!(
                    "Item {} is {} and cannot be confirmed",
                    serial,
                    other.to_string().to_lowercase()
                ),
            };
            return Err(ServiceError::conflict(
                "inventory item",
                Some(item.status.to_string()),
                "confirm",
                message,
            ));
        }

        trace::record(
            &txn,
            TraceRecord::new(
                SubjectType::Inventory,
                item.id,
                item.serial_number.clone(),
                TraceEventType::ScanConfirmed,
            )
            .location(location.code.clone())
            .actor(input.actor.clone()),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::counter!("ilms.inventory.confirmed", 1);
        info!(serial, location = %location.code, "Scan confirmed");
        self.event_sender
            .send_or_log(Event::InventoryConfirmed {
                item_id: item.id,
                serial_number: serial.to_string(),
                location_id,
            })
            .await;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn void(
        &self,
        serial: &str,
        actor: Option<String>,
    ) -> Result<inventory_item::Model, ServiceError> {
        let serial = serial.trim();
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let item = find_by_serial(&txn, serial).await?;
        if !item.status.is_voidable() {
            return Err(ServiceError::conflict(
                "inventory item",
                Some(item.status.to_string()),
                "void",
                format!("Item {} is {} and cannot be voided", serial, item.status),
            ));
        }
        let voided = transition_item(&txn, &item, InventoryStatus::Voided, None).await?;
        trace::record(
            &txn,
            TraceRecord::new(
                SubjectType::Inventory,
                item.id,
                item.serial_number.clone(),
                TraceEventType::ItemVoided,
            )
            .actor(actor),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        warn!(serial, previous = %item.status, "Inventory item voided");
        self.event_sender
            .send_or_log(Event::InventoryVoided(item.id))
            .await;
        Ok(voided)
    }

    #[instrument(skip(self))]
    pub async fn get_by_serial(&self, serial: &str) -> Result<inventory_item::Model, ServiceError> {
        let serial = serial.trim();
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move { find_by_serial(db, serial).await }).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let status = status
            .map(|s| parse_enum::<InventoryStatus>("status", s))
            .transpose()?;
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            let mut query = inventory_item::Entity::find();
            if let Some(status) = status {
                query = query.filter(inventory_item::Column::Status.eq(status));
            }
            query
                .order_by_desc(inventory_item::Column::CreatedAt)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }
}

fn new_item(
    material_id: Uuid,
    serial: String,
    batch_number: Option<String>,
    status: InventoryStatus,
    location_id: Option<Uuid>,
) -> inventory_item::ActiveModel {
    let now = Utc::now();
    inventory_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        material_id: Set(material_id),
        serial_number: Set(Some(serial)),
        batch_number: Set(batch_number),
        status: Set(status),
        location_id: Set(location_id),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Moves an item to `to` if nobody changed it since it was read. `location`
/// of `Some(..)` also rewrites the item's location.
pub(crate) async fn transition_item<C: ConnectionTrait>(
    conn: &C,
    item: &inventory_item::Model,
    to: InventoryStatus,
    location: Option<Option<Uuid>>,
) -> Result<inventory_item::Model, ServiceError> {
    let now = Utc::now();
    let mut update = inventory_item::Entity::update_many()
        .col_expr(inventory_item::Column::Status, Expr::value(to.to_value()))
        .col_expr(inventory_item::Column::Version, Expr::value(item.version + 1))
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now));
    if let Some(location_id) = location {
        update = update.col_expr(inventory_item::Column::LocationId, Expr::value(location_id));
    }
    let result = update
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::Version.eq(item.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(item.id));
    }

    Ok(inventory_item::Model {
        status: to,
        version: item.version + 1,
        updated_at: now,
        location_id: location.unwrap_or(item.location_id),
        ..item.clone()
    })
}

async fn find_by_serial<C: ConnectionTrait>(
    conn: &C,
    serial: &str,
) -> Result<inventory_item::Model, ServiceError> {
    inventory_item::Entity::find()
        .filter(inventory_item::Column::SerialNumber.eq(serial))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", serial)))
}

async fn find_material<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<material::Model, ServiceError> {
    let code = code.trim();
    material::Entity::find()
        .filter(material::Column::Code.eq(code))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", code)))
}

async fn find_location<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<location::Model, ServiceError> {
    location::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::validation("location_id", format!("Location {} does not exist", id))
        })
}
