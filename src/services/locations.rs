use crate::{
    db::DbPool,
    errors::ServiceError,
    middleware_helpers::retry::RetryConfig,
    models::{
        container,
        definition::DefinitionType,
        inventory_item,
        location::{self, LocationStatus, WAREHOUSE_TYPE},
        parse_enum, shipment,
    },
    services::definitions::warn_if_unregistered,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateLocation {
    #[validate(length(min = 1, max = 64, message = "Location code is required"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Location name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "Location type is required"))]
    pub location_type: String,
    pub category: Option<String>,
    pub parent_id: Option<Uuid>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0))]
    pub capacity_volume: Option<f64>,
    #[validate(range(min = 0.0))]
    pub capacity_weight: Option<f64>,
    #[validate(length(equal = 13, message = "GLN must be 13 digits"))]
    pub gln: Option<String>,
    pub rfid_reader_id: Option<String>,
    #[serde(default)]
    pub is_quarantine: bool,
    pub status: Option<String>,
}

/// Partial update; `parent_id: null` moves the location to the root set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLocation {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub location_type: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub parent_id: Option<Option<Uuid>>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0))]
    pub capacity_volume: Option<f64>,
    #[validate(range(min = 0.0))]
    pub capacity_weight: Option<f64>,
    pub gln: Option<String>,
    pub rfid_reader_id: Option<String>,
    pub is_quarantine: Option<bool>,
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct LocationService {
    db_pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl LocationService {
    pub fn new(db_pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { db_pool, retry }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<location::Model>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            location::Entity::find()
                .order_by_asc(location::Column::Code)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_warehouses(&self) -> Result<Vec<location::Model>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            location::Entity::find()
                .filter(location::Column::LocationType.eq(WAREHOUSE_TYPE))
                .order_by_asc(location::Column::Code)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, code: &str) -> Result<location::Model, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move { find_by_code(db, code).await })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", code)))
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<location::Model, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            location::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))
    }

    /// Direct children of `parent_id`; `None` returns the root locations.
    #[instrument(skip(self))]
    pub async fn get_children(
        &self,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<location::Model>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            let filter = match parent_id {
                Some(id) => location::Column::ParentId.eq(id),
                None => location::Column::ParentId.is_null(),
            };
            location::Entity::find()
                .filter(filter)
                .order_by_asc(location::Column::Code)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateLocation) -> Result<location::Model, ServiceError> {
        input.validate()?;
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(ServiceError::validation("code", "Location code is required"));
        }
        let status = match input.status.as_deref() {
            Some(s) => parse_enum("status", s)?,
            None => LocationStatus::Active,
        };

        let db = &*self.db_pool;
        if let Some(parent_id) = input.parent_id {
            ensure_parent_exists(db, parent_id).await?;
        }
        warn_if_unregistered(db, DefinitionType::LocationType, Some(&input.location_type)).await?;
        warn_if_unregistered(db, DefinitionType::LocationCat, input.category.as_deref()).await?;

        let now = Utc::now();
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            name: Set(input.name),
            location_type: Set(input.location_type),
            category: Set(input.category),
            parent_id: Set(input.parent_id),
            address_line1: Set(input.address_line1),
            city: Set(input.city),
            state: Set(input.state),
            country: Set(input.country),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            capacity_volume: Set(input.capacity_volume),
            capacity_weight: Set(input.capacity_weight),
            gln: Set(input.gln),
            rfid_reader_id: Set(input.rfid_reader_id),
            is_quarantine: Set(input.is_quarantine),
            status: Set(status),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = model
            .insert(db)
            .await
            .map_err(|e| ServiceError::db_error_for("location", &code, e))?;

        info!(id = %saved.id, code = %saved.code, "Location created");
        Ok(saved)
    }

    /// Updates a location. Re-parenting under itself or one of its own
    /// descendants is rejected.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        code: &str,
        input: UpdateLocation,
    ) -> Result<location::Model, ServiceError> {
        input.validate()?;
        // the cycle check and the parent write must see the same tree
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let db = &txn;
        let existing = find_by_code(db, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", code)))?;

        let mut active: location::ActiveModel = existing.clone().into();

        if let Some(parent) = input.parent_id {
            if let Some(parent_id) = parent {
                ensure_parent_exists(db, parent_id).await?;
                if would_create_cycle(db, existing.id, parent_id).await? {
                    return Err(ServiceError::conflict(
                        "location",
                        existing.parent_id.map(|p| p.to_string()),
                        "reparent",
                        format!(
                            "Location {} cannot be moved under itself or one of its descendants",
                            existing.code
                        ),
                    ));
                }
            }
            active.parent_id = Set(parent);
        }
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(location_type) = input.location_type {
            warn_if_unregistered(db, DefinitionType::LocationType, Some(&location_type)).await?;
            active.location_type = Set(location_type);
        }
        if let Some(category) = input.category {
            warn_if_unregistered(db, DefinitionType::LocationCat, category.as_deref()).await?;
            active.category = Set(category);
        }
        if let Some(v) = input.address_line1 {
            active.address_line1 = Set(Some(v));
        }
        if let Some(v) = input.city {
            active.city = Set(Some(v));
        }
        if let Some(v) = input.state {
            active.state = Set(Some(v));
        }
        if let Some(v) = input.country {
            active.country = Set(Some(v));
        }
        if let Some(v) = input.latitude {
            active.latitude = Set(Some(v));
        }
        if let Some(v) = input.longitude {
            active.longitude = Set(Some(v));
        }
        if let Some(v) = input.capacity_volume {
            active.capacity_volume = Set(Some(v));
        }
        if let Some(v) = input.capacity_weight {
            active.capacity_weight = Set(Some(v));
        }
        if let Some(v) = input.gln {
            active.gln = Set(Some(v));
        }
        if let Some(v) = input.rfid_reader_id {
            active.rfid_reader_id = Set(Some(v));
        }
        if let Some(v) = input.is_quarantine {
            active.is_quarantine = Set(v);
        }
        if let Some(status) = input.status {
            active.status = Set(parse_enum("status", &status)?);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(code = %updated.code, "Location updated");
        Ok(updated)
    }

    /// Deletes a leaf location. Locations that still have children, or that
    /// inventory, containers or shipments point at, are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, code: &str) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let db = &txn;
        let existing = find_by_code(db, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", code)))?;

        let children = location::Entity::find()
            .filter(location::Column::ParentId.eq(existing.id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if children > 0 {
            return Err(ServiceError::conflict(
                "location",
                Some(format!("{} child location(s)", children)),
                "delete",
                format!(
                    "Location {} still has {} child location(s); move or delete them first",
                    existing.code, children
                ),
            ));
        }

        if let Some(holder) = first_reference(db, existing.id).await? {
            return Err(ServiceError::conflict(
                "location",
                Some(format!("referenced by {}", holder)),
                "delete",
                format!("Location {} is still referenced by {}", existing.code, holder),
            ));
        }

        location::Entity::delete_by_id(existing.id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(code = %existing.code, "Location deleted");
        Ok(())
    }
}

async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<location::Model>, ServiceError> {
    location::Entity::find()
        .filter(location::Column::Code.eq(code))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn ensure_parent_exists<C: ConnectionTrait>(
    conn: &C,
    parent_id: Uuid,
) -> Result<(), ServiceError> {
    let found = location::Entity::find_by_id(parent_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    match found {
        Some(_) => Ok(()),
        None => Err(ServiceError::validation(
            "parent_id",
            format!("Parent location {} does not exist", parent_id),
        )),
    }
}

/// Names the first kind of record that still points at the location.
async fn first_reference<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<&'static str>, ServiceError> {
    let items = inventory_item::Entity::find()
        .filter(inventory_item::Column::LocationId.eq(id))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if items > 0 {
        return Ok(Some("inventory items"));
    }
    let containers = container::Entity::find()
        .filter(container::Column::LocationId.eq(id))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if containers > 0 {
        return Ok(Some("containers"));
    }
    let shipments = shipment::Entity::find()
        .filter(
            Condition::any()
                .add(shipment::Column::OriginLocationId.eq(id))
                .add(shipment::Column::DestinationLocationId.eq(id)),
        )
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if shipments > 0 {
        return Ok(Some("shipments"));
    }
    Ok(None)
}

/// Walks up from `new_parent`; reaching `id` means the move would close a loop.
async fn would_create_cycle<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    new_parent: Uuid,
) -> Result<bool, ServiceError> {
    let mut visited = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == id {
            return Ok(true);
        }
        if !visited.insert(current) {
            // pre-existing loop that does not involve `id`
            return Ok(false);
        }
        cursor = location::Entity::find_by_id(current)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .and_then(|l| l.parent_id);
    }
    Ok(false)
}
