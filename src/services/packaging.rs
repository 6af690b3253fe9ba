use crate::{
    db::DbPool,
    errors::ServiceError,
    labels::print::{plan_label_counts, LevelLabelCount},
    middleware_helpers::retry::RetryConfig,
    models::{label_template, packaging_hierarchy, packaging_level},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateHierarchy {
    #[validate(length(min = 1, max = 255, message = "Hierarchy name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLevel {
    pub hierarchy_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Level name is required"))]
    pub level_name: String,
    /// Nesting depth, 1 = innermost
    #[validate(range(min = 1, message = "Level order starts at 1"))]
    pub level_order: i32,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    pub label_template_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLevel {
    #[validate(length(min = 1, max = 100))]
    pub level_name: Option<String>,
    #[validate(range(min = 1))]
    pub level_order: Option<i32>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub capacity: Option<Option<i32>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub label_template_id: Option<Option<Uuid>>,
}

/// A hierarchy with its levels, innermost first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyWithLevels {
    #[serde(flatten)]
    pub hierarchy: packaging_hierarchy::Model,
    pub levels: Vec<packaging_level::Model>,
}

#[derive(Clone)]
pub struct PackagingService {
    db_pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl PackagingService {
    pub fn new(db_pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { db_pool, retry }
    }

    #[instrument(skip(self))]
    pub async fn get_hierarchies(&self) -> Result<Vec<HierarchyWithLevels>, ServiceError> {
        let db = &*self.db_pool;
        let rows = super::read(&self.retry, move || async move {
            packaging_hierarchy::Entity::find()
                .order_by_asc(packaging_hierarchy::Column::Name)
                .find_with_related(packaging_level::Entity)
                .order_by_asc(packaging_level::Column::LevelOrder)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|(hierarchy, levels)| HierarchyWithLevels { hierarchy, levels })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn create_hierarchy(
        &self,
        input: CreateHierarchy,
    ) -> Result<packaging_hierarchy::Model, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "Hierarchy name is required"));
        }
        let model = packaging_hierarchy::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        };
        let saved = model.insert(&*self.db_pool).await.map_err(ServiceError::db_error)?;
        info!(id = %saved.id, name = %saved.name, "Packaging hierarchy created");
        Ok(saved)
    }

    /// Levels of a hierarchy sorted by `level_order`.
    #[instrument(skip(self))]
    pub async fn get_levels(
        &self,
        hierarchy_id: Uuid,
    ) -> Result<Vec<packaging_level::Model>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            ensure_hierarchy(db, hierarchy_id).await?;
            packaging_level::Entity::find()
                .filter(packaging_level::Column::HierarchyId.eq(hierarchy_id))
                .order_by_asc(packaging_level::Column::LevelOrder)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_level(
        &self,
        input: CreateLevel,
    ) -> Result<packaging_level::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        ensure_hierarchy(db, input.hierarchy_id).await?;
        if let Some(template_id) = input.label_template_id {
            ensure_template(db, template_id).await?;
        }

        let now = Utc::now();
        let model = packaging_level::ActiveModel {
            id: Set(Uuid::new_v4()),
            hierarchy_id: Set(input.hierarchy_id),
            level_name: Set(input.level_name.trim().to_string()),
            level_order: Set(input.level_order),
            capacity: Set(input.capacity),
            label_template_id: Set(input.label_template_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = model
            .insert(db)
            .await
            .map_err(|e| duplicate_order(e, input.level_order))?;

        info!(
            id = %saved.id,
            hierarchy_id = %saved.hierarchy_id,
            level_order = saved.level_order,
            "Packaging level created"
        );
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn update_level(
        &self,
        id: Uuid,
        input: UpdateLevel,
    ) -> Result<packaging_level::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let existing = find_level(db, id).await?;
        let mut active: packaging_level::ActiveModel = existing.into();

        if let Some(name) = input.level_name {
            active.level_name = Set(name.trim().to_string());
        }
        if let Some(order) = input.level_order {
            active.level_order = Set(order);
        }
        if let Some(capacity) = input.capacity {
            if matches!(capacity, Some(c) if c < 1) {
                return Err(ServiceError::validation(
                    "capacity",
                    "Capacity must be at least 1",
                ));
            }
            active.capacity = Set(capacity);
        }
        if let Some(template) = input.label_template_id {
            if let Some(template_id) = template {
                ensure_template(db, template_id).await?;
            }
            active.label_template_id = Set(template);
        }
        active.updated_at = Set(Utc::now());

        let order = input.level_order.unwrap_or_default();
        let updated = active
            .update(db)
            .await
            .map_err(|e| duplicate_order(e, order))?;
        info!(%id, "Packaging level updated");
        Ok(updated)
    }

    /// Binds a label template to a level. Dimensions are not checked.
    #[instrument(skip(self))]
    pub async fn link_template(
        &self,
        level_id: Uuid,
        template_id: Uuid,
    ) -> Result<packaging_level::Model, ServiceError> {
        self.update_level(
            level_id,
            UpdateLevel {
                label_template_id: Some(Some(template_id)),
                ..Default::default()
            },
        )
        .await
    }

    /// Removes a level. Containers built at this level keep existing and lose
    /// the reference.
    #[instrument(skip(self))]
    pub async fn delete_level(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = packaging_level::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Packaging level {} not found",
                id
            )));
        }
        info!(%id, "Packaging level deleted");
        Ok(())
    }

    /// Labels needed per level to pack `total_items` units.
    #[instrument(skip(self))]
    pub async fn plan_label_counts(
        &self,
        hierarchy_id: Uuid,
        total_items: i64,
    ) -> Result<Vec<LevelLabelCount>, ServiceError> {
        let levels = self.get_levels(hierarchy_id).await?;
        plan_label_counts(&levels, total_items)
    }
}

fn duplicate_order(err: sea_orm::DbErr, order: i32) -> ServiceError {
    match ServiceError::db_error(err) {
        ServiceError::Conflict(_) => ServiceError::conflict(
            "packaging level",
            None,
            "set level_order",
            format!("Level order {} is already used in this hierarchy", order),
        ),
        other => other,
    }
}

async fn ensure_hierarchy<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), ServiceError> {
    packaging_hierarchy::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Packaging hierarchy {} not found", id)))
}

async fn ensure_template<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), ServiceError> {
    label_template::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Label template {} not found", id)))
}

async fn find_level<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<packaging_level::Model, ServiceError> {
    packaging_level::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Packaging level {} not found", id)))
}
