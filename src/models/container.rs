use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ContainerType {
    #[sea_orm(string_value = "BOX")]
    Box,
    #[sea_orm(string_value = "PALLET")]
    Pallet,
    #[sea_orm(string_value = "SHIPPING_CONTAINER")]
    ShippingContainer,
}

impl ContainerType {
    /// Prefix used in generated serial numbers.
    pub fn serial_prefix(&self) -> &'static str {
        match self {
            ContainerType::Box => "BOX",
            ContainerType::Pallet => "PAL",
            ContainerType::ShippingContainer => "SHC",
        }
    }

    /// GS1 extension digit used when building an SSCC for this type.
    pub fn extension_digit(&self) -> u8 {
        match self {
            ContainerType::Box => 0,
            ContainerType::Pallet => 1,
            ContainerType::ShippingContainer => 2,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ContainerStatus {
    #[sea_orm(string_value = "EMPTY")]
    Empty,
    #[sea_orm(string_value = "PARTIAL")]
    Partial,
    #[sea_orm(string_value = "FULL")]
    Full,
    #[sea_orm(string_value = "SEALED")]
    Sealed,
    #[sea_orm(string_value = "SHIPPED")]
    Shipped,
}

impl ContainerStatus {
    /// Fill status for an open container holding `count` children.
    /// A missing capacity means the container never becomes FULL.
    pub fn for_fill(count: i32, capacity: Option<i32>) -> Self {
        match capacity {
            _ if count <= 0 => ContainerStatus::Empty,
            Some(cap) if count >= cap => ContainerStatus::Full,
            _ => ContainerStatus::Partial,
        }
    }

    /// Children can be added or removed.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ContainerStatus::Empty | ContainerStatus::Partial | ContainerStatus::Full
        )
    }
}

/// A physical logistics unit that other units are packed into.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "containers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub container_type: ContainerType,
    pub capacity: Option<i32>,
    pub current_count: i32,
    pub status: ContainerStatus,
    pub packaging_level_id: Option<Uuid>,
    pub location_id: Uuid,
    pub created_by: Option<String>,
    pub sealed_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_full(&self) -> bool {
        matches!(self.capacity, Some(cap) if self.current_count >= cap)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::aggregation::Entity")]
    Aggregations,
    #[sea_orm(
        belongs_to = "super::packaging_level::Entity",
        from = "Column::PackagingLevelId",
        to = "super::packaging_level::Column::Id",
        on_delete = "SetNull"
    )]
    PackagingLevel,
}

impl Related<super::aggregation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aggregations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_status_follows_capacity() {
        assert_eq!(ContainerStatus::for_fill(0, Some(2)), ContainerStatus::Empty);
        assert_eq!(ContainerStatus::for_fill(1, Some(2)), ContainerStatus::Partial);
        assert_eq!(ContainerStatus::for_fill(2, Some(2)), ContainerStatus::Full);
    }

    #[test]
    fn unbounded_container_never_fills() {
        assert_eq!(ContainerStatus::for_fill(10_000, None), ContainerStatus::Partial);
        assert_eq!(ContainerStatus::for_fill(0, None), ContainerStatus::Empty);
    }

    #[test]
    fn sealed_and_shipped_are_closed() {
        assert!(!ContainerStatus::Sealed.is_open());
        assert!(!ContainerStatus::Shipped.is_open());
        assert!(ContainerStatus::Full.is_open());
    }
}
