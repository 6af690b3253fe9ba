use crate::{
    db::DbPool,
    errors::ServiceError,
    middleware_helpers::retry::RetryConfig,
    models::{
        definition::DefinitionType,
        material::{self, MaterialStatus},
        parse_enum,
    },
    services::definitions::warn_if_unregistered,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateMaterial {
    #[validate(length(min = 1, max = 64, message = "Material code is required"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Material name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub material_type: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 16, message = "Base unit of measure is required"))]
    pub base_uom: String,
    #[serde(default)]
    pub is_batch_managed: bool,
    #[serde(default)]
    pub is_serial_managed: bool,
    #[validate(range(min = 0))]
    pub shelf_life_days: Option<i32>,
    pub min_stock: Option<f64>,
    pub max_stock: Option<f64>,
    pub gross_weight: Option<f64>,
    pub net_weight: Option<f64>,
    pub weight_uom: Option<String>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub dimension_uom: Option<String>,
    #[serde(default)]
    pub is_hazmat: bool,
    pub hazmat_class: Option<String>,
    pub un_number: Option<String>,
    pub status: Option<String>,
}

/// Partial update. The material code is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateMaterial {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub material_type: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 16))]
    pub base_uom: Option<String>,
    pub is_batch_managed: Option<bool>,
    pub is_serial_managed: Option<bool>,
    #[validate(range(min = 0))]
    pub shelf_life_days: Option<i32>,
    pub min_stock: Option<f64>,
    pub max_stock: Option<f64>,
    pub gross_weight: Option<f64>,
    pub net_weight: Option<f64>,
    pub weight_uom: Option<String>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub dimension_uom: Option<String>,
    pub is_hazmat: Option<bool>,
    pub hazmat_class: Option<String>,
    pub un_number: Option<String>,
    pub status: Option<String>,
}

/// Cross-field rules checked against the material as it will be stored.
fn check_material_rules(m: &material::Model) -> Result<(), ServiceError> {
    for (field, value) in [
        ("min_stock", m.min_stock),
        ("max_stock", m.max_stock),
        ("gross_weight", m.gross_weight),
        ("net_weight", m.net_weight),
        ("length", m.length),
        ("width", m.width),
        ("height", m.height),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(ServiceError::validation(
                    field,
                    format!("{} must be zero or greater", field),
                ));
            }
        }
    }
    if let (Some(net), Some(gross)) = (m.net_weight, m.gross_weight) {
        if net > gross {
            return Err(ServiceError::validation(
                "net_weight",
                "Net weight cannot exceed gross weight",
            ));
        }
    }
    if let (Some(min), Some(max)) = (m.min_stock, m.max_stock) {
        if min > max {
            return Err(ServiceError::validation(
                "min_stock",
                "Minimum stock cannot exceed maximum stock",
            ));
        }
    }
    if m.is_hazmat && m.hazmat_class.as_deref().map_or(true, |c| c.trim().is_empty()) {
        return Err(ServiceError::validation(
            "hazmat_class",
            "Hazardous materials require a hazmat class",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl MaterialService {
    pub fn new(db_pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { db_pool, retry }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<material::Model>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            material::Entity::find()
                .order_by_asc(material::Column::Code)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, code: &str) -> Result<material::Model, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            material::Entity::find()
                .filter(material::Column::Code.eq(code))
                .one(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", code)))
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateMaterial) -> Result<material::Model, ServiceError> {
        input.validate()?;
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(ServiceError::validation("code", "Material code is required"));
        }
        let status = match input.status.as_deref() {
            Some(s) => parse_enum("status", s)?,
            None => MaterialStatus::Active,
        };

        let now = Utc::now();
        let candidate = material::Model {
            id: Uuid::new_v4(),
            code: code.clone(),
            name: input.name,
            description: input.description,
            material_type: input.material_type,
            category: input.category,
            base_uom: input.base_uom,
            is_batch_managed: input.is_batch_managed,
            is_serial_managed: input.is_serial_managed,
            shelf_life_days: input.shelf_life_days,
            min_stock: input.min_stock,
            max_stock: input.max_stock,
            gross_weight: input.gross_weight,
            net_weight: input.net_weight,
            weight_uom: input.weight_uom,
            length: input.length,
            width: input.width,
            height: input.height,
            dimension_uom: input.dimension_uom,
            is_hazmat: input.is_hazmat,
            hazmat_class: input.hazmat_class,
            un_number: input.un_number,
            status,
            created_at: now,
            updated_at: now,
        };
        check_material_rules(&candidate)?;

        let db = &*self.db_pool;
        warn_if_unregistered(db, DefinitionType::MaterialType, candidate.material_type.as_deref())
            .await?;
        warn_if_unregistered(db, DefinitionType::MaterialCat, candidate.category.as_deref())
            .await?;

        let saved = material::ActiveModel::from(candidate)
            .reset_all()
            .insert(db)
            .await
            .map_err(|e| ServiceError::db_error_for("material", &code, e))?;

        info!(id = %saved.id, code = %saved.code, "Material created");
        Ok(saved)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        code: &str,
        input: UpdateMaterial,
    ) -> Result<material::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(code).await?;
        let mut merged = existing.clone();

        if let Some(v) = input.name {
            merged.name = v;
        }
        if let Some(v) = input.description {
            merged.description = Some(v);
        }
        if let Some(v) = input.material_type {
            merged.material_type = Some(v);
        }
        if let Some(v) = input.category {
            merged.category = Some(v);
        }
        if let Some(v) = input.base_uom {
            merged.base_uom = v;
        }
        if let Some(v) = input.is_batch_managed {
            merged.is_batch_managed = v;
        }
        if let Some(v) = input.is_serial_managed {
            merged.is_serial_managed = v;
        }
        if let Some(v) = input.shelf_life_days {
            merged.shelf_life_days = Some(v);
        }
        if let Some(v) = input.min_stock {
            merged.min_stock = Some(v);
        }
        if let Some(v) = input.max_stock {
            merged.max_stock = Some(v);
        }
        if let Some(v) = input.gross_weight {
            merged.gross_weight = Some(v);
        }
        if let Some(v) = input.net_weight {
            merged.net_weight = Some(v);
        }
        if let Some(v) = input.weight_uom {
            merged.weight_uom = Some(v);
        }
        if let Some(v) = input.length {
            merged.length = Some(v);
        }
        if let Some(v) = input.width {
            merged.width = Some(v);
        }
        if let Some(v) = input.height {
            merged.height = Some(v);
        }
        if let Some(v) = input.dimension_uom {
            merged.dimension_uom = Some(v);
        }
        if let Some(v) = input.is_hazmat {
            merged.is_hazmat = v;
        }
        if let Some(v) = input.hazmat_class {
            merged.hazmat_class = Some(v);
        }
        if let Some(v) = input.un_number {
            merged.un_number = Some(v);
        }
        if let Some(v) = input.status {
            merged.status = parse_enum("status", &v)?;
        }
        merged.updated_at = Utc::now();
        check_material_rules(&merged)?;

        let db = &*self.db_pool;
        if merged.material_type != existing.material_type {
            warn_if_unregistered(db, DefinitionType::MaterialType, merged.material_type.as_deref())
                .await?;
        }
        if merged.category != existing.category {
            warn_if_unregistered(db, DefinitionType::MaterialCat, merged.category.as_deref())
                .await?;
        }

        // Every column is rewritten except the immutable ones.
        let mut active = material::ActiveModel::from(merged).reset_all();
        active.id = sea_orm::ActiveValue::Unchanged(existing.id);
        active.code = sea_orm::ActiveValue::Unchanged(existing.code);
        active.created_at = sea_orm::ActiveValue::Unchanged(existing.created_at);

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;
        info!(code = %updated.code, "Material updated");
        Ok(updated)
    }

    /// Deletes a material. Materials with registered inventory are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, code: &str) -> Result<(), ServiceError> {
        let existing = self.get(code).await?;
        material::Entity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| match ServiceError::db_error(e) {
                ServiceError::Conflict(_) => ServiceError::conflict(
                    "material",
                    None,
                    "delete",
                    format!("Material {} still has inventory items", existing.code),
                ),
                other => other,
            })?;
        info!(code = %existing.code, "Material deleted");
        Ok(())
    }
}
