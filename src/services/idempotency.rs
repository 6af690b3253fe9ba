use crate::{
    db::DbPool,
    errors::{is_unique_violation, ServiceError},
    models::idempotency_key,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sea_orm::{sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A claim left unfinished this long is treated as abandoned.
const IN_PROGRESS_TIMEOUT_SECS: i64 = 300;

/// A response recorded for an idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status_code: u16,
    pub body: String,
    pub content_type: Option<String>,
}

/// Result of claiming a key before the request runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The caller owns the key and must `complete` or `release` it.
    Acquired,
    /// An earlier request with this key already finished.
    Replay(StoredResponse),
}

/// Persists the first outcome of a keyed request so retries replay it
/// instead of applying the change twice.
///
/// A key is claimed with an in-progress row before the request runs; the
/// primary key on that row decides which of two concurrent requests proceeds.
#[derive(Clone)]
pub struct IdempotencyService {
    db_pool: Arc<DbPool>,
    ttl: Duration,
}

impl IdempotencyService {
    pub fn new(db_pool: Arc<DbPool>, ttl: Duration) -> Self {
        Self { db_pool, ttl }
    }

    /// Claims `key` for a request with the given fingerprint.
    ///
    /// Returns the stored response when the key already completed, and a
    /// conflict when it belongs to a different request or is still being
    /// processed.
    #[instrument(skip(self))]
    pub async fn claim(&self, key: &str, fingerprint: &str) -> Result<Claim, ServiceError> {
        let db = &*self.db_pool;
        // a second pass follows removal of an expired or abandoned claim
        for _ in 0..2 {
            let placeholder = idempotency_key::ActiveModel {
                key: Set(key.to_string()),
                request_fingerprint: Set(fingerprint.to_string()),
                status_code: Set(0),
                response_body: Set(String::new()),
                content_type: Set(None),
                completed: Set(false),
                created_at: Set(Utc::now()),
            };
            let err = match placeholder.insert(db).await {
                Ok(_) => {
                    metrics::counter!("ilms.idempotency.claimed", 1);
                    return Ok(Claim::Acquired);
                }
                Err(e) if is_unique_violation(&e) => e,
                Err(e) => return Err(ServiceError::db_error(e)),
            };
            debug!(key, error = %err, "Idempotency key already claimed");

            let Some(row) = idempotency_key::Entity::find_by_id(key.to_string())
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
            else {
                continue;
            };

            if self.is_stale(&row) {
                debug!(key, completed = row.completed, "Discarding stale idempotency key");
                idempotency_key::Entity::delete_many()
                    .filter(idempotency_key::Column::Key.eq(key))
                    .filter(idempotency_key::Column::CreatedAt.eq(row.created_at))
                    .exec(db)
                    .await
                    .map_err(ServiceError::db_error)?;
                continue;
            }
            if row.request_fingerprint != fingerprint {
                return Err(ServiceError::conflict(
                    "idempotency key",
                    None,
                    fingerprint,
                    format!(
                        "Idempotency key {} was already used for {}",
                        key, row.request_fingerprint
                    ),
                ));
            }
            if !row.completed {
                return Err(in_progress(key));
            }

            metrics::counter!("ilms.idempotency.replayed", 1);
            return Ok(Claim::Replay(StoredResponse {
                status_code: u16::try_from(row.status_code).unwrap_or(200),
                body: row.response_body,
                content_type: row.content_type,
            }));
        }
        Err(in_progress(key))
    }

    /// Records the outcome of a claimed key so later requests replay it.
    #[instrument(skip(self, response), fields(status = response.status_code))]
    pub async fn complete(&self, key: &str, response: StoredResponse) -> Result<(), ServiceError> {
        let result = idempotency_key::Entity::update_many()
            .col_expr(
                idempotency_key::Column::StatusCode,
                Expr::value(i32::from(response.status_code)),
            )
            .col_expr(idempotency_key::Column::ResponseBody, Expr::value(response.body))
            .col_expr(
                idempotency_key::Column::ContentType,
                Expr::value(response.content_type),
            )
            .col_expr(idempotency_key::Column::Completed, Expr::value(true))
            .filter(idempotency_key::Column::Key.eq(key))
            .filter(idempotency_key::Column::Completed.eq(false))
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            warn!(key, "Idempotency claim vanished before completion");
        }
        Ok(())
    }

    /// Drops an unfinished claim so the client may retry with the same key.
    #[instrument(skip(self))]
    pub async fn release(&self, key: &str) -> Result<(), ServiceError> {
        idempotency_key::Entity::delete_many()
            .filter(idempotency_key::Column::Key.eq(key))
            .filter(idempotency_key::Column::Completed.eq(false))
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    /// Deletes expired keys and returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        let result = idempotency_key::Entity::delete_many()
            .filter(idempotency_key::Column::CreatedAt.lt(self.cutoff()))
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(result.rows_affected)
    }

    fn is_stale(&self, row: &idempotency_key::Model) -> bool {
        if row.created_at < self.cutoff() {
            return true;
        }
        !row.completed
            && row.created_at < Utc::now() - ChronoDuration::seconds(IN_PROGRESS_TIMEOUT_SECS)
    }

    fn cutoff(&self) -> DateTime<Utc> {
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::days(1));
        Utc::now() - ttl
    }
}

fn in_progress(key: &str) -> ServiceError {
    ServiceError::conflict(
        "idempotency key",
        Some("IN_PROGRESS".into()),
        "replay",
        format!("A request with idempotency key {} is still in progress", key),
    )
}
