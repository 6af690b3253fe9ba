use crate::{
    db::DbPool,
    errors::ServiceError,
    middleware_helpers::retry::RetryConfig,
    models::{
        container, inventory_item, shipment,
        trace_event::{self, SubjectType, TraceEventType},
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// One state transition to append to the history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
    pub subject_serial: Option<String>,
    pub event_type: TraceEventType,
    pub location: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

impl TraceRecord {
    pub fn new(
        subject_type: SubjectType,
        subject_id: Uuid,
        subject_serial: Option<String>,
        event_type: TraceEventType,
    ) -> Self {
        Self {
            subject_type,
            subject_id,
            subject_serial,
            event_type,
            location: None,
            actor: None,
            notes: None,
        }
    }

    pub fn location(mut self, location: impl Into<Option<String>>) -> Self {
        self.location = location.into();
        self
    }

    pub fn actor(mut self, actor: impl Into<Option<String>>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Appends an event. Callers pass their open transaction so the event
/// commits or rolls back with the change it describes.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    rec: TraceRecord,
) -> Result<trace_event::Model, ServiceError> {
    let event = trace_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        subject_type: Set(rec.subject_type),
        subject_id: Set(rec.subject_id),
        subject_serial: Set(rec.subject_serial),
        event_type: Set(rec.event_type),
        timestamp: Set(Utc::now()),
        location: Set(rec.location),
        actor: Set(rec.actor),
        notes: Set(rec.notes),
    };
    let saved = event.insert(conn).await.map_err(ServiceError::db_error)?;
    metrics::counter!("ilms.trace.events", 1);
    Ok(saved)
}

/// Read side of the trace log.
#[derive(Clone)]
pub struct TraceService {
    db_pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl TraceService {
    pub fn new(db_pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { db_pool, retry }
    }

    /// History for a subject, newest first.
    ///
    /// A UUID selects events by subject id. Anything else is looked up as an
    /// inventory serial, then a container serial, then a shipment number.
    /// Unknown subjects have an empty history.
    #[instrument(skip(self))]
    pub async fn get_history(&self, subject: &str) -> Result<Vec<trace_event::Model>, ServiceError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ServiceError::validation(
                "subject",
                "Enter a serial number, shipment number or id to trace",
            ));
        }

        let subject_id = match Uuid::parse_str(subject) {
            Ok(id) => Some(id),
            Err(_) => self.resolve_identifier(subject).await?,
        };

        let Some(subject_id) = subject_id else {
            debug!(subject, "Trace subject not found");
            return Ok(Vec::new());
        };

        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            trace_event::Entity::find()
                .filter(trace_event::Column::SubjectId.eq(subject_id))
                .order_by_desc(trace_event::Column::Timestamp)
                .all(db)
                .await
                .map_err(ServiceError::db_error)
        })
        .await
    }

    async fn resolve_identifier(&self, identifier: &str) -> Result<Option<Uuid>, ServiceError> {
        let db = &*self.db_pool;
        super::read(&self.retry, move || async move {
            if let Some(item) = inventory_item::Entity::find()
                .filter(inventory_item::Column::SerialNumber.eq(identifier))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
            {
                return Ok(Some(item.id));
            }
            if let Some(c) = container::Entity::find()
                .filter(container::Column::SerialNumber.eq(identifier))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
            {
                return Ok(Some(c.id));
            }
            let found = shipment::Entity::find()
                .filter(shipment::Column::ShipmentNumber.eq(identifier))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            Ok(found.map(|s| s.id))
        })
        .await
    }
}
