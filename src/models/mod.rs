// Reference data
pub mod definition;
pub mod location;
pub mod material;

// Packaging and labelling
pub mod label_template;
pub mod packaging_hierarchy;
pub mod packaging_level;

// Physical units and their movement
pub mod aggregation;
pub mod container;
pub mod inventory_item;
pub mod shipment;
pub mod shipment_item;

// Append-only history and request bookkeeping
pub mod idempotency_key;
pub mod trace_event;

use crate::errors::ServiceError;
use sea_orm::ActiveEnum;
use std::str::FromStr;

/// Parses a closed enumeration at the service boundary, naming the
/// offending field and the accepted values on failure.
pub fn parse_enum<T>(field: &str, value: &str) -> Result<T, ServiceError>
where
    T: ActiveEnum<Value = String> + FromStr,
{
    T::from_str(value.trim()).map_err(|_| {
        ServiceError::validation(
            field,
            format!(
                "Unknown {} '{}'; expected one of: {}",
                field,
                value,
                T::values().join(", ")
            ),
        )
    })
}
