use crate::{
    db::DbPool,
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
    middleware_helpers::retry::RetryConfig,
    models::{
        aggregation::{self, ChildType},
        container::{self, ContainerStatus},
        location, parse_enum,
        shipment::{self, ShipmentStatus},
        shipment_item::{self, ShipmentItemStatus, ShipmentItemType},
        trace_event::{SubjectType, TraceEventType},
    },
    services::{
        containers::{find_container, update_container_cas},
        serials::{SerialGenerator, MAX_SERIAL_ATTEMPTS},
        trace::{self, TraceRecord},
        ItemError,
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const LOAD_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShipment {
    pub origin_location_id: Uuid,
    pub destination_location_id: Uuid,
    #[validate(length(max = 100))]
    pub carrier: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItems {
    #[serde(default = "default_item_type")]
    pub item_type: String,
    pub item_ids: Vec<Uuid>,
    pub actor: Option<String>,
}

fn default_item_type() -> String {
    ShipmentItemType::Container.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DispatchShipment {
    #[validate(length(max = 50))]
    pub vehicle_number: Option<String>,
    #[validate(length(max = 100))]
    pub driver_name: Option<String>,
    #[validate(length(max = 50))]
    pub driver_contact: Option<String>,
    pub actor: Option<String>,
}

/// Per-container result of loading a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsOutcome {
    pub success: bool,
    pub added: Vec<Uuid>,
    pub errors: Vec<ItemError>,
    pub shipment: shipment::Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedItem {
    #[serde(flatten)]
    pub item: shipment_item::Model,
    pub serial_number: Option<String>,
}

#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    serials: SerialGenerator,
    retry: RetryConfig,
}

impl ShipmentService {
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

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateShipment) -> Result<shipment::Model, ServiceError> {
        input.validate()?;
        if input.origin_location_id == input.destination_location_id {
            return Err(ServiceError::validation(
                "destination_location_id",
                "Origin and destination must be different locations",
            ));
        }
        let db = &*self.db_pool;
        let origin = find_location(db, "origin_location_id", input.origin_location_id).await?;
        find_location(db, "destination_location_id", input.destination_location_id).await?;

        for attempt in 1..=MAX_SERIAL_ATTEMPTS {
            let now = Utc::now();
            let number = self.serials.shipment_number(now);
            let model = shipment::ActiveModel {
                id: Set(Uuid::new_v4()),
                shipment_number: Set(number.clone()),
                origin_location_id: Set(input.origin_location_id),
                destination_location_id: Set(input.destination_location_id),
                carrier: Set(input.carrier.clone()),
                expected_delivery_date: Set(input.expected_delivery_date),
                notes: Set(input.notes.clone()),
                status: Set(ShipmentStatus::Created),
                vehicle_number: Set(None),
                driver_name: Set(None),
                driver_contact: Set(None),
                dispatched_at: Set(None),
                delivered_at: Set(None),
                received_by: Set(None),
                created_by: Set(input.created_by.clone()),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            };

            let txn = db.begin().await.map_err(ServiceError::db_error)?;
            let saved = match model.insert(&txn).await {
                Ok(saved) => saved,
                Err(e) if is_unique_violation(&e) => {
                    debug!(attempt, number = %number, "Shipment number collision, regenerating");
                    continue;
                }
                Err(e) => return Err(ServiceError::db_error(e)),
            };
            trace::record(
                &txn,
                shipment_trace(&saved, TraceEventType::ShipmentCreated)
                    .location(origin.code.clone())
                    .actor(input.created_by.clone()),
            )
            .await?;
            txn.commit().await.map_err(ServiceError::db_error)?;

            metrics::counter!("ilms.shipments.created", 1);
            info!(id = %saved.id, number = %saved.shipment_number, "Shipment created");
            self.event_sender
                .send_or_log(Event::ShipmentCreated {
                    shipment_id: saved.id,
                    shipment_number: saved.shipment_number.clone(),
                })
                .await;
            return Ok(saved);
        }

        Err(ServiceError::InternalError(format!(
            "Could not generate a unique shipment number after {} attempts",
            MAX_SERIAL_ATTEMPTS
        )))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<shipment::Model>, ServiceError> {
        let status = status
            .map(|s| parse_enum::<ShipmentStatus>("status", s))
            .transpose()?;
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            let mut query = shipment::Entity::find();
            if let Some(status) = status {
                query = query.filter(shipment::Column::Status.eq(status));
            }
            query
                .order_by_desc(shipment::Column::CreatedAt)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move { find_shipment(db, id).await }).await
    }

    #[instrument(skip(self))]
    pub async fn get_items(&self, id: Uuid) -> Result<Vec<LoadedItem>, ServiceError> {
        let db = &*self.db_pool;
        let items = super::read(&self.retry, move || async move {
            find_shipment(db, id).await?;
            shipment_item::Entity::find()
                .filter(shipment_item::Column::ShipmentId.eq(id))
                .order_by_asc(shipment_item::Column::AddedAt)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?;

        let ids: Vec<Uuid> = items.iter().map(|i| i.item_id).collect();
        let mut serials: HashMap<Uuid, String> = HashMap::new();
        if !ids.is_empty() {
            for c in container::Entity::find()
                .filter(container::Column::Id.is_in(ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
            {
                serials.insert(c.id, c.serial_number);
            }
        }

        Ok(items
            .into_iter()
            .map(|item| LoadedItem {
                serial_number: serials.remove(&item.item_id),
                item,
            })
            .collect())
    }

    /// Loads sealed containers onto a shipment. The first container loaded
    /// moves the shipment from CREATED to LOADING.
    #[instrument(skip(self, input), fields(items = input.item_ids.len()))]
    pub async fn add_items(
        &self,
        shipment_id: Uuid,
        input: AddItems,
    ) -> Result<ItemsOutcome, ServiceError> {
        let item_type: ShipmentItemType = parse_enum("item_type", &input.item_type)?;
        if input.item_ids.is_empty() {
            return Err(ServiceError::validation("item_ids", "No containers to load"));
        }

        let db = &*self.db_pool;
        let mut current = find_shipment(db, shipment_id).await?;
        ensure_editable(&current, "add items")?;

        let mut added = Vec::new();
        let mut errors = Vec::new();
        for item_id in input.item_ids {
            let mut attempt = 0;
            let result = loop {
                attempt += 1;
                match self
                    .load_one(shipment_id, item_type, item_id, input.actor.as_deref())
                    .await
                {
                    Err(ServiceError::ConcurrentModification(_)) if attempt < LOAD_ATTEMPTS => {
                        continue
                    }
                    other => break other,
                }
            };
            match result {
                Ok(updated) => {
                    added.push(item_id);
                    current = updated;
                }
                Err(e) => {
                    warn!(%item_id, error = %e, "Container not loaded");
                    errors.push(ItemError::from_error(item_id, &e));
                }
            }
        }

        if !added.is_empty() {
            info!(
                number = %current.shipment_number,
                added = added.len(),
                status = %current.status,
                "Containers loaded"
            );
            self.event_sender
                .send_or_log(Event::ShipmentLoaded {
                    shipment_id,
                    added: added.len(),
                })
                .await;
        }

        Ok(ItemsOutcome {
            success: errors.is_empty(),
            added,
            errors,
            shipment: current,
        })
    }

    async fn load_one(
        &self,
        shipment_id: Uuid,
        item_type: ShipmentItemType,
        container_id: Uuid,
        actor: Option<&str>,
    ) -> Result<shipment::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_shipment(&txn, shipment_id).await?;
        ensure_editable(&current, "add items")?;

        let unit = find_container(&txn, container_id).await?;
        if unit.status != ContainerStatus::Sealed {
            return Err(ServiceError::conflict(
                "container",
                Some(unit.status.to_string()),
                "load",
                format!(
                    "Container {} must be sealed before it is loaded",
                    unit.serial_number
                ),
            ));
        }

        // nested units travel with their outer container
        if let Some(nested) = aggregation::Entity::find()
            .filter(aggregation::Column::ChildType.eq(ChildType::Container))
            .filter(aggregation::Column::ChildId.eq(container_id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
        {
            let outer = find_container(&txn, nested.container_id).await?;
            return Err(ServiceError::conflict(
                "container",
                Some(unit.status.to_string()),
                "load",
                format!(
                    "Container {} is packed inside {}; load the outer container instead",
                    unit.serial_number, outer.serial_number
                ),
            ));
        }

        if let Some(existing) = shipment_item::Entity::find()
            .filter(shipment_item::Column::ItemId.eq(container_id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
        {
            let holder = find_shipment(&txn, existing.shipment_id).await?;
            return Err(ServiceError::conflict(
                "container",
                Some(unit.status.to_string()),
                "load",
                format!(
                    "Container {} is already on shipment {}",
                    unit.serial_number, holder.shipment_number
                ),
            ));
        }

        let row = shipment_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            item_type: Set(item_type),
            item_id: Set(container_id),
            status: Set(ShipmentItemStatus::Loaded),
            added_at: Set(Utc::now()),
        };
        row.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::conflict(
                    "container",
                    Some(unit.status.to_string()),
                    "load",
                    format!("Container {} is already on a shipment", unit.serial_number),
                )
            } else {
                ServiceError::db_error(e)
            }
        })?;

        let mut next = current.clone();
        if current.status == ShipmentStatus::Created {
            next.status = ShipmentStatus::Loading;
        }
        let updated = save_cas(&txn, &current, next).await?;

        trace::record(
            &txn,
            TraceRecord::new(
                SubjectType::Container,
                unit.id,
                Some(unit.serial_number.clone()),
                TraceEventType::Loaded,
            )
            .actor(actor.map(str::to_string))
            .notes(format!("Loaded onto {}", current.shipment_number)),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }

    /// Takes a container off a shipment that has not left yet.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        shipment_id: Uuid,
        item_type: &str,
        item_id: Uuid,
        actor: Option<String>,
    ) -> Result<shipment::Model, ServiceError> {
        let item_type: ShipmentItemType = parse_enum("item_type", item_type)?;
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_shipment(&txn, shipment_id).await?;
        ensure_editable(&current, "remove item")?;

        let result = shipment_item::Entity::delete_many()
            .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
            .filter(shipment_item::Column::ItemType.eq(item_type))
            .filter(shipment_item::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Item {} is not on shipment {}",
                item_id, current.shipment_number
            )));
        }
        let updated = save_cas(&txn, &current, current.clone()).await?;

        let serial = container::Entity::find_by_id(item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|c| c.serial_number);
        trace::record(
            &txn,
            TraceRecord::new(SubjectType::Container, item_id, serial, TraceEventType::Unloaded)
                .actor(actor)
                .notes(format!("Removed from {}", current.shipment_number)),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(number = %updated.shipment_number, %item_id, "Item removed from shipment");
        Ok(updated)
    }

    /// Hands a loaded shipment to the carrier. Every loaded container is
    /// marked SHIPPED in the same transaction.
    #[instrument(skip(self, input))]
    pub async fn dispatch(
        &self,
        shipment_id: Uuid,
        input: DispatchShipment,
    ) -> Result<shipment::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_shipment(&txn, shipment_id).await?;

        let loaded = shipment_item::Entity::find()
            .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if loaded.is_empty() && current.status.is_editable() {
            return Err(ServiceError::conflict(
                "shipment",
                Some(current.status.to_string()),
                "dispatch",
                format!(
                    "Shipment {} has no items; load at least one container first",
                    current.shipment_number
                ),
            ));
        }
        ensure_transition(&current, ShipmentStatus::Dispatched, "dispatch")?;

        let now = Utc::now();
        let mut next = current.clone();
        next.status = ShipmentStatus::Dispatched;
        next.dispatched_at = Some(now);
        next.vehicle_number = input.vehicle_number;
        next.driver_name = input.driver_name;
        next.driver_contact = input.driver_contact;
        let updated = save_cas(&txn, &current, next).await?;

        for item in &loaded {
            let unit = find_container(&txn, item.item_id).await?;
            update_container_cas(&txn, &unit, unit.current_count, ContainerStatus::Shipped, None)
                .await?;
            trace::record(
                &txn,
                TraceRecord::new(
                    SubjectType::Container,
                    unit.id,
                    Some(unit.serial_number.clone()),
                    TraceEventType::Dispatched,
                )
                .actor(input.actor.clone())
                .notes(format!("Dispatched with {}", updated.shipment_number)),
            )
            .await?;
        }
        let mut rec = shipment_trace(&updated, TraceEventType::Dispatched).actor(input.actor);
        if let Some(vehicle) = &updated.vehicle_number {
            rec = rec.notes(format!("Vehicle {}", vehicle));
        }
        trace::record(&txn, rec).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::counter!("ilms.shipments.dispatched", 1);
        info!(
            number = %updated.shipment_number,
            containers = loaded.len(),
            "Shipment dispatched"
        );
        self.event_sender
            .send_or_log(Event::ShipmentDispatched(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn mark_in_transit(
        &self,
        shipment_id: Uuid,
        actor: Option<String>,
    ) -> Result<shipment::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_shipment(&txn, shipment_id).await?;
        ensure_transition(&current, ShipmentStatus::InTransit, "mark in transit")?;

        let mut next = current.clone();
        next.status = ShipmentStatus::InTransit;
        let updated = save_cas(&txn, &current, next).await?;
        trace::record(
            &txn,
            shipment_trace(&updated, TraceEventType::InTransit).actor(actor),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(number = %updated.shipment_number, "Shipment in transit");
        self.event_sender
            .send_or_log(Event::ShipmentInTransit(updated.id))
            .await;
        Ok(updated)
    }

    /// Confirms arrival. Only shipments that have been dispatched can be
    /// received.
    #[instrument(skip(self))]
    pub async fn receive(
        &self,
        shipment_id: Uuid,
        actor: Option<String>,
    ) -> Result<shipment::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_shipment(&txn, shipment_id).await?;
        ensure_transition(&current, ShipmentStatus::Delivered, "receive")?;

        let destination = location::Entity::find_by_id(current.destination_location_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|l| l.code);

        let mut next = current.clone();
        next.status = ShipmentStatus::Delivered;
        next.delivered_at = Some(Utc::now());
        next.received_by = actor.clone();
        let updated = save_cas(&txn, &current, next).await?;

        shipment_item::Entity::update_many()
            .col_expr(
                shipment_item::Column::Status,
                Expr::value(ShipmentItemStatus::Delivered.to_value()),
            )
            .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        trace::record(
            &txn,
            shipment_trace(&updated, TraceEventType::Delivered)
                .location(destination)
                .actor(actor),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::counter!("ilms.shipments.delivered", 1);
        info!(number = %updated.shipment_number, "Shipment delivered");
        self.event_sender
            .send_or_log(Event::ShipmentDelivered(updated.id))
            .await;
        Ok(updated)
    }

    /// Cancels a shipment that has not been dispatched and releases its
    /// containers.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        shipment_id: Uuid,
        actor: Option<String>,
    ) -> Result<shipment::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_shipment(&txn, shipment_id).await?;
        ensure_transition(&current, ShipmentStatus::Cancelled, "cancel")?;

        let released = shipment_item::Entity::delete_many()
            .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .rows_affected;
        let mut next = current.clone();
        next.status = ShipmentStatus::Cancelled;
        let updated = save_cas(&txn, &current, next).await?;
        trace::record(
            &txn,
            shipment_trace(&updated, TraceEventType::Cancelled)
                .actor(actor)
                .notes(format!("{} container(s) released", released)),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        warn!(number = %updated.shipment_number, released, "Shipment cancelled");
        self.event_sender
            .send_or_log(Event::ShipmentCancelled(updated.id))
            .await;
        Ok(updated)
    }

    /// Number of containers currently loaded.
    pub async fn item_count(&self, shipment_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            shipment_item::Entity::find()
                .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
                .count(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }
}

fn shipment_trace(s: &shipment::Model, event: TraceEventType) -> TraceRecord {
    TraceRecord::new(
        SubjectType::Shipment,
        s.id,
        Some(s.shipment_number.clone()),
        event,
    )
}

fn ensure_editable(s: &shipment::Model, attempted: &str) -> Result<(), ServiceError> {
    if s.status.is_editable() {
        return Ok(());
    }
    Err(ServiceError::conflict(
        "shipment",
        Some(s.status.to_string()),
        attempted,
        format!(
            "Shipment {} is {}; items can only change before dispatch",
            s.shipment_number, s.status
        ),
    ))
}

fn ensure_transition(
    s: &shipment::Model,
    next: ShipmentStatus,
    attempted: &str,
) -> Result<(), ServiceError> {
    if s.status.can_transition_to(next) {
        return Ok(());
    }
    Err(ServiceError::conflict(
        "shipment",
        Some(s.status.to_string()),
        attempted,
        format!(
            "Shipment {} cannot go from {} to {}",
            s.shipment_number, s.status, next
        ),
    ))
}

/// Writes `next` only if the row still carries `current.version`.
async fn save_cas<C: ConnectionTrait>(
    conn: &C,
    current: &shipment::Model,
    mut next: shipment::Model,
) -> Result<shipment::Model, ServiceError> {
    next.version = current.version + 1;
    next.updated_at = Utc::now();
    let result = shipment::Entity::update_many()
        .set(shipment::ActiveModel::from(next.clone()).reset_all())
        .filter(shipment::Column::Id.eq(current.id))
        .filter(shipment::Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    Ok(next)
}

async fn find_shipment<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<shipment::Model, ServiceError> {
    shipment::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", id)))
}

async fn find_location<C: ConnectionTrait>(
    conn: &C,
    field: &str,
    id: Uuid,
) -> Result<location::Model, ServiceError> {
    location::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::validation(field, format!("Location {} does not exist", id)))
}
