// Reference data
pub mod definitions;
pub mod locations;
pub mod materials;

// Packaging and labelling
pub mod label_templates;
pub mod packaging;

// Physical units and their movement
pub mod containers;
pub mod inventory;
pub mod serials;
pub mod shipments;

// History and request bookkeeping
pub mod idempotency;
pub mod trace;

// Service factory for dependency injection
pub mod factory;

use crate::errors::ServiceError;
use crate::middleware_helpers::retry::{with_retry, DbRetryPolicy, RetryConfig};
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;

/// Runs an idempotent read with bounded backoff on transient store failures.
pub(crate) async fn read<F, Fut, T>(retry: &RetryConfig, op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    metrics::counter!("ilms.store.reads", 1);
    with_retry(retry, DbRetryPolicy, op).await
}

/// Distinguishes an absent field from an explicit `null` in update payloads.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Why a single item of a batch operation was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub item_id: String,
    pub kind: crate::errors::ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
}

impl ItemError {
    pub fn from_error(item_id: impl ToString, err: &ServiceError) -> Self {
        let current_state = match err {
            ServiceError::Conflict(c) => c.current.clone(),
            _ => None,
        };
        Self {
            item_id: item_id.to_string(),
            kind: err.kind(),
            message: err.response_message(),
            current_state,
        }
    }
}
