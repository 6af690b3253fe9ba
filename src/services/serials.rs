//! Identifier generation for containers, shipments and inventory items.

use crate::errors::ServiceError;
use crate::labels::gs1;
use crate::models::container::ContainerType;
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

/// Attempts made when a generated identifier collides with an existing one.
pub const MAX_SERIAL_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct SerialGenerator {
    gs1_company_prefix: Option<String>,
}

impl SerialGenerator {
    pub fn new(gs1_company_prefix: Option<String>) -> Self {
        Self {
            gs1_company_prefix: gs1_company_prefix.filter(|p| !p.trim().is_empty()),
        }
    }

    /// `{BOX|PAL|SHC}-YYYYMMDD-NNNNN`, or an SSCC-18 when a GS1 company prefix
    /// is configured.
    pub fn container_serial(
        &self,
        container_type: ContainerType,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let mut rng = rand::thread_rng();
        match &self.gs1_company_prefix {
            Some(prefix) => {
                let reference_digits = 16u32.saturating_sub(prefix.len() as u32);
                let upper = 10u64.pow(reference_digits);
                gs1::sscc18(
                    container_type.extension_digit(),
                    prefix,
                    rng.gen_range(0..upper),
                )
            }
            None => Ok(format!(
                "{}-{}-{:05}",
                container_type.serial_prefix(),
                now.format("%Y%m%d"),
                rng.gen_range(1..100_000u32)
            )),
        }
    }

    /// `SHP-YYYYMMDD-NNNN`
    pub fn shipment_number(&self, now: DateTime<Utc>) -> String {
        format!(
            "SHP-{}-{:04}",
            now.format("%Y%m%d"),
            rand::thread_rng().gen_range(1..10_000u32)
        )
    }

    /// `{MATERIAL}-YYYYMMDD-XXXXXXXXXX` for items registered without a
    /// pre-printed label.
    pub fn inventory_serial(&self, material_code: &str, now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
        format!("{}-{}-{}", material_code, now.format("%Y%m%d"), suffix)
    }
}
