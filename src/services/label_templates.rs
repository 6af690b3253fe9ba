use crate::{
    db::DbPool,
    errors::ServiceError,
    labels::{
        canvas::CanvasDesign,
        print::{impose, Imposition, PaperSize},
        render::{placeholders, render, RenderedLabel},
    },
    middleware_helpers::retry::RetryConfig,
    models::{
        label_template::{self, TemplateStatus},
        parse_enum,
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTemplate {
    #[validate(length(min = 1, max = 255, message = "Template name is required"))]
    pub name: String,
    pub level_name: Option<String>,
    #[validate(range(min = 1.0, max = 1000.0, message = "Width must be between 1 and 1000 mm"))]
    pub width_mm: f64,
    #[validate(range(min = 1.0, max = 1000.0, message = "Height must be between 1 and 1000 mm"))]
    pub height_mm: f64,
    pub status: Option<String>,
    #[serde(default)]
    pub canvas_design: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTemplate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub level_name: Option<Option<String>>,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub width_mm: Option<f64>,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub height_mm: Option<f64>,
    pub status: Option<String>,
    pub canvas_design: Option<Value>,
}

#[derive(Clone)]
pub struct LabelTemplateService {
    db_pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl LabelTemplateService {
    pub fn new(db_pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { db_pool, retry }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<label_template::Model>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            label_template::Entity::find()
                .order_by_asc(label_template::Column::Name)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<label_template::Model, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            label_template::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Label template {} not found", id)))
    }

    /// The template's design, decoded and validated.
    pub async fn design(&self, id: Uuid) -> Result<(label_template::Model, CanvasDesign), ServiceError> {
        let template = self.get(id).await?;
        let design = CanvasDesign::from_stored(&template.canvas_design)?;
        Ok((template, design))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateTemplate) -> Result<label_template::Model, ServiceError> {
        input.validate()?;
        let status = match input.status.as_deref() {
            Some(s) => parse_enum("status", s)?,
            None => TemplateStatus::Draft,
        };
        let design = CanvasDesign::parse(&input.canvas_design)?;

        let now = Utc::now();
        let model = label_template::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            level_name: Set(input.level_name),
            width_mm: Set(input.width_mm),
            height_mm: Set(input.height_mm),
            status: Set(status),
            canvas_design: Set(design.to_value()?),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = model
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        info!(id = %saved.id, elements = design.elements.len(), "Label template created");
        Ok(saved)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateTemplate,
    ) -> Result<label_template::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        let mut active: label_template::ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(level_name) = input.level_name {
            active.level_name = Set(level_name);
        }
        if let Some(w) = input.width_mm {
            active.width_mm = Set(w);
        }
        if let Some(h) = input.height_mm {
            active.height_mm = Set(h);
        }
        if let Some(status) = input.status {
            active.status = Set(parse_enum::<TemplateStatus>("status", &status)?);
        }
        if let Some(raw) = input.canvas_design {
            let design = CanvasDesign::parse(&raw)?;
            active.canvas_design = Set(design.to_value()?);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        info!(%id, "Label template updated");
        Ok(updated)
    }

    /// Deletes a template; levels bound to it are unlinked.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = label_template::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Label template {} not found",
                id
            )));
        }
        info!(%id, "Label template deleted");
        Ok(())
    }

    #[instrument(skip(self, data))]
    pub async fn render(
        &self,
        id: Uuid,
        data: &HashMap<String, String>,
    ) -> Result<RenderedLabel, ServiceError> {
        let (template, design) = self.design(id).await?;
        Ok(render(template.width_mm, template.height_mm, &design, data))
    }

    /// Placeholder keys used by the template, in first-appearance order.
    pub async fn placeholders(&self, id: Uuid) -> Result<Vec<String>, ServiceError> {
        let (_, design) = self.design(id).await?;
        Ok(placeholders(&design))
    }

    /// Sheet layout for printing `total_labels` copies of the template.
    pub async fn impose(
        &self,
        id: Uuid,
        paper: PaperSize,
        total_labels: u32,
    ) -> Result<Imposition, ServiceError> {
        let template = self.get(id).await?;
        impose(paper, template.width_mm, template.height_mm, total_labels)
    }
}
