use crate::{
    db::DbPool,
    errors::ServiceError,
    middleware_helpers::retry::RetryConfig,
    models::{
        definition::{self, DefinitionType},
        parse_enum,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDefinition {
    pub def_type: String,
    #[validate(length(min = 1, max = 100, message = "Definition value must not be empty"))]
    pub def_value: String,
    pub description: Option<String>,
}

/// Whether `value` is registered under `def_type`.
pub async fn is_registered<C: ConnectionTrait>(
    conn: &C,
    def_type: DefinitionType,
    value: &str,
) -> Result<bool, ServiceError> {
    let count = definition::Entity::find()
        .filter(definition::Column::DefType.eq(def_type))
        .filter(definition::Column::DefValue.eq(value))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(count > 0)
}

/// Logs a warning when a vocabulary value is not registered. The reference is
/// advisory, so the caller's write proceeds either way.
pub async fn warn_if_unregistered<C: ConnectionTrait>(
    conn: &C,
    def_type: DefinitionType,
    value: Option<&str>,
) -> Result<(), ServiceError> {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        if !is_registered(conn, def_type, value).await? {
            warn!(%def_type, value, "Value is not a registered definition");
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct DefinitionService {
    db_pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl DefinitionService {
    pub fn new(db_pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { db_pool, retry }
    }

    /// Lists definitions ordered by type then value.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        def_type: Option<&str>,
    ) -> Result<Vec<definition::Model>, ServiceError> {
        let def_type = def_type
            .map(|t| parse_enum::<DefinitionType>("def_type", t))
            .transpose()?;
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            let mut query = definition::Entity::find();
            if let Some(t) = def_type {
                query = query.filter(definition::Column::DefType.eq(t));
            }
            query
                .order_by_asc(definition::Column::DefType)
                .order_by_asc(definition::Column::DefValue)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateDefinition) -> Result<definition::Model, ServiceError> {
        let def_type: DefinitionType = parse_enum("def_type", &input.def_type)?;
        let def_value = input.def_value.trim().to_string();
        if def_value.is_empty() {
            return Err(ServiceError::validation(
                "def_value",
                "Definition value must not be empty",
            ));
        }
        input.validate()?;

        let model = definition::ActiveModel {
            id: Set(Uuid::new_v4()),
            def_type: Set(def_type),
            def_value: Set(def_value.clone()),
            description: Set(input.description),
            created_at: Set(Utc::now()),
        };
        let saved = model.insert(&*self.db_pool).await.map_err(|e| {
            ServiceError::db_error_for(
                "definition",
                &format!("{} {}", def_type, def_value),
                e,
            )
        })?;

        info!(id = %saved.id, %def_type, value = %saved.def_value, "Definition created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = definition::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Definition {} not found", id)));
        }
        info!(%id, "Definition deleted");
        Ok(())
    }

    pub async fn is_registered(
        &self,
        def_type: DefinitionType,
        value: &str,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            is_registered(db, def_type, value).await
        })
        .await
    }
}
