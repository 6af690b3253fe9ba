use crate::{
    db::DbPool,
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
    middleware_helpers::retry::RetryConfig,
    models::{
        aggregation::{self, ChildType},
        container::{self, ContainerStatus, ContainerType},
        inventory_item::{self, InventoryStatus},
        location, packaging_level, parse_enum, shipment, shipment_item,
        trace_event::{SubjectType, TraceEventType},
    },
    services::{
        inventory::transition_item,
        serials::{SerialGenerator, MAX_SERIAL_ATTEMPTS},
        trace::{self, TraceRecord},
        ItemError,
    },
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts per child when another writer bumps the container version.
const PACK_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContainer {
    pub container_type: String,
    /// Maximum number of children; unset means unbounded
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    pub packaging_level_id: Option<Uuid>,
    pub location_id: Uuid,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackRequest {
    pub child_type: String,
    pub child_ids: Vec<Uuid>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealRequest {
    pub actor: Option<String>,
}

/// Per-child result of a pack or unpack call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackOutcome {
    /// True only when every requested child was applied
    pub success: bool,
    pub packed: Vec<Uuid>,
    pub errors: Vec<ItemError>,
    /// Container state after the call
    pub container: container::Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(flatten)]
    pub aggregation: aggregation::Model,
    pub child_serial: Option<String>,
    pub child_status: Option<String>,
}

#[derive(Clone)]
pub struct ContainerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    serials: SerialGenerator,
    retry: RetryConfig,
}

impl ContainerService {
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

    /// Creates an EMPTY container with a generated serial number. Capacity
    /// defaults to the packaging level's capacity when a level is given.
    #[instrument(skip(self, input), fields(container_type = %input.container_type))]
    pub async fn create(&self, input: CreateContainer) -> Result<container::Model, ServiceError> {
        input.validate()?;
        let container_type: ContainerType = parse_enum("container_type", &input.container_type)?;
        let db = &*self.db_pool;

        let location = location::Entity::find_by_id(input.location_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::validation(
                    "location_id",
                    format!("Location {} does not exist", input.location_id),
                )
            })?;

        let mut capacity = input.capacity;
        if let Some(level_id) = input.packaging_level_id {
            let level = packaging_level::Entity::find_by_id(level_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Packaging level {} not found", level_id))
                })?;
            capacity = capacity.or(level.capacity);
        }

        for attempt in 1..=MAX_SERIAL_ATTEMPTS {
            let now = Utc::now();
            let serial = self.serials.container_serial(container_type, now)?;
            let model = container::ActiveModel {
                id: Set(Uuid::new_v4()),
                serial_number: Set(serial.clone()),
                container_type: Set(container_type),
                capacity: Set(capacity),
                current_count: Set(0),
                status: Set(ContainerStatus::Empty),
                packaging_level_id: Set(input.packaging_level_id),
                location_id: Set(location.id),
                created_by: Set(input.created_by.clone()),
                sealed_at: Set(None),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            };

            let txn = db.begin().await.map_err(ServiceError::db_error)?;
            let saved = match model.insert(&txn).await {
                Ok(saved) => saved,
                Err(e) if is_unique_violation(&e) => {
                    debug!(attempt, serial = %serial, "Container serial collision, regenerating");
                    continue;
                }
                Err(e) => return Err(ServiceError::db_error(e)),
            };
            trace::record(
                &txn,
                TraceRecord::new(
                    SubjectType::Container,
                    saved.id,
                    Some(saved.serial_number.clone()),
                    TraceEventType::ContainerCreated,
                )
                .location(location.code.clone())
                .actor(input.created_by.clone()),
            )
            .await?;
            txn.commit().await.map_err(ServiceError::db_error)?;

            metrics::counter!("ilms.containers.created", 1);
            info!(id = %saved.id, serial = %saved.serial_number, "Container created");
            self.event_sender
                .send_or_log(Event::ContainerCreated {
                    container_id: saved.id,
                    serial_number: saved.serial_number.clone(),
                })
                .await;
            return Ok(saved);
        }

        Err(ServiceError::InternalError(format!(
            "Could not generate a unique container serial after {} attempts",
            MAX_SERIAL_ATTEMPTS
        )))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<container::Model>, ServiceError> {
        let status = status
            .map(|s| parse_enum::<ContainerStatus>("status", s))
            .transpose()?;
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            let mut query = container::Entity::find();
            if let Some(status) = status {
                query = query.filter(container::Column::Status.eq(status));
            }
            query
                .order_by_desc(container::Column::CreatedAt)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<container::Model, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move { find_container(db, id).await }).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_serial(&self, serial: &str) -> Result<container::Model, ServiceError> {
        let serial = serial.trim();
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            container::Entity::find()
                .filter(container::Column::SerialNumber.eq(serial))
                .one(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Container {} not found", serial)))
    }

    /// Children currently packed in a container, oldest first.
    #[instrument(skip(self))]
    pub async fn get_contents(&self, container_id: Uuid) -> Result<Vec<ContentEntry>, ServiceError> {
        let db = &*self.db_pool;
        let records = super::read(&self.retry, move || async move {
            find_container(db, container_id).await?;
            aggregation::Entity::find()
                .filter(aggregation::Column::ContainerId.eq(container_id))
                .order_by_asc(aggregation::Column::AggregatedAt)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?;

        let inventory_ids: Vec<Uuid> = records
            .iter()
            .filter(|r| r.child_type == ChildType::Inventory)
            .map(|r| r.child_id)
            .collect();
        let container_ids: Vec<Uuid> = records
            .iter()
            .filter(|r| r.child_type == ChildType::Container)
            .map(|r| r.child_id)
            .collect();

        let mut details: HashMap<Uuid, (Option<String>, String)> = HashMap::new();
        if !inventory_ids.is_empty() {
            for item in inventory_item::Entity::find()
                .filter(inventory_item::Column::Id.is_in(inventory_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
            {
                details.insert(item.id, (item.serial_number, item.status.to_string()));
            }
        }
        if !container_ids.is_empty() {
            for child in container::Entity::find()
                .filter(container::Column::Id.is_in(container_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
            {
                details.insert(child.id, (Some(child.serial_number), child.status.to_string()));
            }
        }

        Ok(records
            .into_iter()
            .map(|aggregation| {
                let (child_serial, child_status) = match details.remove(&aggregation.child_id) {
                    Some((serial, status)) => (serial, Some(status)),
                    None => (None, None),
                };
                ContentEntry {
                    aggregation,
                    child_serial,
                    child_status,
                }
            })
            .collect())
    }

    /// Packs children into a container, each in its own transaction.
    ///
    /// The call fails as a whole only when the container itself cannot take
    /// children. Otherwise every child is reported as packed or with the
    /// reason it was refused.
    #[instrument(skip(self, child_ids), fields(children = child_ids.len()))]
    pub async fn pack(
        &self,
        container_id: Uuid,
        child_type: &str,
        child_ids: Vec<Uuid>,
        actor: Option<String>,
    ) -> Result<PackOutcome, ServiceError> {
        let child_type: ChildType = parse_enum("child_type", child_type)?;
        if child_ids.is_empty() {
            return Err(ServiceError::validation("child_ids", "No items to pack"));
        }

        let db = &*self.db_pool;
        let mut current = find_container(db, container_id).await?;
        ensure_open(&current, "pack")?;
        if current.is_full() {
            return Err(container_full(&current));
        }

        let mut packed = Vec::new();
        let mut errors = Vec::new();
        for child_id in child_ids {
            if current.is_full() {
                errors.push(ItemError::from_error(child_id, &container_full(&current)));
                continue;
            }

            let mut attempt = 0;
            let result = loop {
                attempt += 1;
                match self
                    .pack_one(container_id, child_type, child_id, actor.as_deref())
                    .await
                {
                    Err(ServiceError::ConcurrentModification(_)) if attempt < PACK_ATTEMPTS => {
                        debug!(%child_id, attempt, "Container changed concurrently, retrying");
                        continue;
                    }
                    other => break other,
                }
            };

            match result {
                Ok(updated) => {
                    packed.push(child_id);
                    current = updated;
                }
                Err(e) => {
                    warn!(%child_id, error = %e, "Child not packed");
                    errors.push(ItemError::from_error(child_id, &e));
                    // the container may have changed underneath us
                    match find_container(db, container_id).await {
                        Ok(fresh) => current = fresh,
                        Err(e) => {
                            warn!(%container_id, error = %e, "Could not refresh container state")
                        }
                    }
                }
            }
        }

        if !packed.is_empty() {
            metrics::counter!("ilms.containers.packed_children", packed.len() as u64);
            info!(
                container = %current.serial_number,
                packed = packed.len(),
                current_count = current.current_count,
                status = %current.status,
                "Children packed"
            );
            self.event_sender
                .send_or_log(Event::ContainerPacked {
                    container_id,
                    packed: packed.len(),
                    current_count: current.current_count,
                })
                .await;
        }

        Ok(PackOutcome {
            success: errors.is_empty(),
            packed,
            errors,
            container: current,
        })
    }

    async fn pack_one(
        &self,
        container_id: Uuid,
        child_type: ChildType,
        child_id: Uuid,
        actor: Option<&str>,
    ) -> Result<container::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let parent = find_container(&txn, container_id).await?;
        ensure_open(&parent, "pack")?;
        if parent.is_full() {
            return Err(container_full(&parent));
        }

        if let Some(existing) = aggregation::Entity::find()
            .filter(aggregation::Column::ChildType.eq(child_type))
            .filter(aggregation::Column::ChildId.eq(child_id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
        {
            let holder = if existing.container_id == container_id {
                "this container".to_string()
            } else {
                container::Entity::find_by_id(existing.container_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .map(|c| format!("container {}", c.serial_number))
                    .unwrap_or_else(|| "another container".to_string())
            };
            return Err(ServiceError::conflict(
                "aggregation",
                Some("PACKED".into()),
                "pack",
                format!("Item {} is already packed in {}", child_id, holder),
            ));
        }

        let child_serial = match child_type {
            ChildType::Inventory => {
                let item = inventory_item::Entity::find_by_id(child_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Inventory item {} not found", child_id))
                    })?;
                if !item.status.is_packable() {
                    return Err(ServiceError::conflict(
                        "inventory item",
                        Some(item.status.to_string()),
                        "pack",
                        format!(
                            "Item {} is {} and cannot be packed",
                            item.serial_number.as_deref().unwrap_or("(unserialized)"),
                            item.status
                        ),
                    ));
                }
                transition_item(
                    &txn,
                    &item,
                    InventoryStatus::Packed,
                    Some(Some(parent.location_id)),
                )
                .await?;
                item.serial_number
            }
            ChildType::Container => {
                if child_id == container_id {
                    return Err(ServiceError::conflict(
                        "container",
                        Some(parent.status.to_string()),
                        "pack",
                        "A container cannot be packed into itself",
                    ));
                }
                let child = find_container(&txn, child_id).await?;
                if child.status != ContainerStatus::Sealed {
                    return Err(ServiceError::conflict(
                        "container",
                        Some(child.status.to_string()),
                        "pack",
                        format!(
                            "Container {} must be sealed before it is packed",
                            child.serial_number
                        ),
                    ));
                }
                if let Some(loaded) = shipment_item::Entity::find()
                    .filter(shipment_item::Column::ItemId.eq(child_id))
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                {
                    let number = shipment::Entity::find_by_id(loaded.shipment_id)
                        .one(&txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .map(|s| s.shipment_number)
                        .unwrap_or_else(|| loaded.shipment_id.to_string());
                    return Err(ServiceError::conflict(
                        "container",
                        Some(child.status.to_string()),
                        "pack",
                        format!(
                            "Container {} is already on shipment {}",
                            child.serial_number, number
                        ),
                    ));
                }
                if is_nested_inside(&txn, container_id, child_id).await? {
                    return Err(ServiceError::conflict(
                        "container",
                        Some(parent.status.to_string()),
                        "pack",
                        format!(
                            "Container {} already holds {}",
                            child.serial_number, parent.serial_number
                        ),
                    ));
                }
                Some(child.serial_number)
            }
        };

        let now = Utc::now();
        let record = aggregation::ActiveModel {
            id: Set(Uuid::new_v4()),
            container_id: Set(container_id),
            child_type: Set(child_type),
            child_id: Set(child_id),
            aggregated_by: Set(actor.map(str::to_string)),
            aggregated_at: Set(now),
        };
        record.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::conflict(
                    "aggregation",
                    Some("PACKED".into()),
                    "pack",
                    format!("Item {} is already packed in another container", child_id),
                )
            } else {
                ServiceError::db_error(e)
            }
        })?;

        let count = parent.current_count + 1;
        let status = ContainerStatus::for_fill(count, parent.capacity);
        let updated = update_container_cas(&txn, &parent, count, status, None).await?;

        trace::record(
            &txn,
            TraceRecord::new(subject_for(child_type), child_id, child_serial, TraceEventType::Packed)
                .actor(actor.map(str::to_string))
                .notes(format!("Packed into {}", parent.serial_number)),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }

    /// Removes children from an open container. Inventory children return to
    /// ACTIVE.
    #[instrument(skip(self, child_ids), fields(children = child_ids.len()))]
    pub async fn unpack(
        &self,
        container_id: Uuid,
        child_type: &str,
        child_ids: Vec<Uuid>,
        actor: Option<String>,
    ) -> Result<PackOutcome, ServiceError> {
        let child_type: ChildType = parse_enum("child_type", child_type)?;
        if child_ids.is_empty() {
            return Err(ServiceError::validation("child_ids", "No items to unpack"));
        }

        let db = &*self.db_pool;
        let mut current = find_container(db, container_id).await?;
        ensure_open(&current, "unpack")?;

        let mut removed = Vec::new();
        let mut errors = Vec::new();
        for child_id in child_ids {
            let mut attempt = 0;
            let result = loop {
                attempt += 1;
                match self
                    .unpack_one(container_id, child_type, child_id, actor.as_deref())
                    .await
                {
                    Err(ServiceError::ConcurrentModification(_)) if attempt < PACK_ATTEMPTS => {
                        continue
                    }
                    other => break other,
                }
            };
            match result {
                Ok(updated) => {
                    removed.push(child_id);
                    current = updated;
                }
                Err(e) => {
                    warn!(%child_id, error = %e, "Child not unpacked");
                    errors.push(ItemError::from_error(child_id, &e));
                }
            }
        }

        if !removed.is_empty() {
            info!(
                container = %current.serial_number,
                removed = removed.len(),
                current_count = current.current_count,
                "Children unpacked"
            );
            self.event_sender
                .send_or_log(Event::ContainerUnpacked {
                    container_id,
                    removed: removed.len(),
                    current_count: current.current_count,
                })
                .await;
        }

        Ok(PackOutcome {
            success: errors.is_empty(),
            packed: removed,
            errors,
            container: current,
        })
    }

    async fn unpack_one(
        &self,
        container_id: Uuid,
        child_type: ChildType,
        child_id: Uuid,
        actor: Option<&str>,
    ) -> Result<container::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let parent = find_container(&txn, container_id).await?;
        ensure_open(&parent, "unpack")?;

        let record = aggregation::Entity::find()
            .filter(aggregation::Column::ContainerId.eq(container_id))
            .filter(aggregation::Column::ChildType.eq(child_type))
            .filter(aggregation::Column::ChildId.eq(child_id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {} is not packed in container {}",
                    child_id, parent.serial_number
                ))
            })?;
        aggregation::Entity::delete_by_id(record.id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let child_serial = match child_type {
            ChildType::Inventory => {
                let item = inventory_item::Entity::find_by_id(child_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                match item {
                    Some(item) if item.status == InventoryStatus::Packed => {
                        transition_item(&txn, &item, InventoryStatus::Active, None).await?;
                        item.serial_number
                    }
                    Some(item) => item.serial_number,
                    None => None,
                }
            }
            ChildType::Container => container::Entity::find_by_id(child_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .map(|c| c.serial_number),
        };

        let count = (parent.current_count - 1).max(0);
        let status = ContainerStatus::for_fill(count, parent.capacity);
        let updated = update_container_cas(&txn, &parent, count, status, None).await?;

        trace::record(
            &txn,
            TraceRecord::new(subject_for(child_type), child_id, child_serial, TraceEventType::Unpacked)
                .actor(actor.map(str::to_string))
                .notes(format!("Removed from {}", parent.serial_number)),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }

    /// Seals a container. Sealing an already sealed container returns it
    /// unchanged.
    #[instrument(skip(self))]
    pub async fn seal(
        &self,
        container_id: Uuid,
        actor: Option<String>,
    ) -> Result<container::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_container(&txn, container_id).await?;

        match current.status {
            ContainerStatus::Sealed => {
                debug!(serial = %current.serial_number, "Container already sealed");
                return Ok(current);
            }
            ContainerStatus::Shipped => {
                return Err(ServiceError::conflict(
                    "container",
                    Some(current.status.to_string()),
                    "seal",
                    format!("Container {} has already shipped", current.serial_number),
                ));
            }
            _ => {}
        }
        if current.current_count == 0 {
            return Err(ServiceError::conflict(
                "container",
                Some(current.status.to_string()),
                "seal",
                format!("Container {} is empty; pack items before sealing", current.serial_number),
            ));
        }

        let now = Utc::now();
        let sealed = update_container_cas(
            &txn,
            &current,
            current.current_count,
            ContainerStatus::Sealed,
            Some(now),
        )
        .await?;
        trace::record(
            &txn,
            TraceRecord::new(
                SubjectType::Container,
                sealed.id,
                Some(sealed.serial_number.clone()),
                TraceEventType::Sealed,
            )
            .actor(actor)
            .notes(format!("Sealed with {} item(s)", sealed.current_count)),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::counter!("ilms.containers.sealed", 1);
        info!(serial = %sealed.serial_number, count = sealed.current_count, "Container sealed");
        self.event_sender
            .send_or_log(Event::ContainerSealed(sealed.id))
            .await;
        Ok(sealed)
    }
}

fn subject_for(child_type: ChildType) -> SubjectType {
    match child_type {
        ChildType::Inventory => SubjectType::Inventory,
        ChildType::Container => SubjectType::Container,
    }
}

fn ensure_open(c: &container::Model, attempted: &str) -> Result<(), ServiceError> {
    if c.status.is_open() {
        return Ok(());
    }
    Err(ServiceError::conflict(
        "container",
        Some(c.status.to_string()),
        attempted,
        format!(
            "Container {} is {}; no further changes are allowed",
            c.serial_number,
            c.status.to_string().to_lowercase()
        ),
    ))
}

fn container_full(c: &container::Model) -> ServiceError {
    ServiceError::conflict(
        "container",
        Some(ContainerStatus::Full.to_string()),
        "pack",
        format!(
            "Container {} is full ({}/{})",
            c.serial_number,
            c.current_count,
            c.capacity.unwrap_or(c.current_count)
        ),
    )
}

pub(crate) async fn find_container<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<container::Model, ServiceError> {
    container::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Container {} not found", id)))
}

/// Writes a new count/status only if the row still carries the version that
/// was read.
pub(crate) async fn update_container_cas<C: ConnectionTrait>(
    conn: &C,
    current: &container::Model,
    count: i32,
    status: ContainerStatus,
    sealed_at: Option<DateTime<Utc>>,
) -> Result<container::Model, ServiceError> {
    let now = Utc::now();
    let mut update = container::Entity::update_many()
        .col_expr(container::Column::CurrentCount, Expr::value(count))
        .col_expr(container::Column::Status, Expr::value(status.to_value()))
        .col_expr(container::Column::Version, Expr::value(current.version + 1))
        .col_expr(container::Column::UpdatedAt, Expr::value(now));
    if let Some(at) = sealed_at {
        update = update.col_expr(container::Column::SealedAt, Expr::value(Some(at)));
    }
    let result = update
        .filter(container::Column::Id.eq(current.id))
        .filter(container::Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(current.id));
    }

    Ok(container::Model {
        current_count: count,
        status,
        version: current.version + 1,
        updated_at: now,
        sealed_at: sealed_at.or(current.sealed_at),
        ..current.clone()
    })
}

/// Whether `container_id` sits somewhere inside `candidate`.
async fn is_nested_inside<C: ConnectionTrait>(
    conn: &C,
    container_id: Uuid,
    candidate: Uuid,
) -> Result<bool, ServiceError> {
    let mut cursor = container_id;
    // nesting is shallow in practice; the bound guards against bad data
    for _ in 0..32 {
        let holder = aggregation::Entity::find()
            .filter(aggregation::Column::ChildType.eq(ChildType::Container))
            .filter(aggregation::Column::ChildId.eq(cursor))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?;
        match holder {
            Some(h) if h.container_id == candidate => return Ok(true),
            Some(h) => cursor = h.container_id,
            None => return Ok(false),
        }
    }
    Ok(false)
}
