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
pub enum InventoryStatus {
    #[sea_orm(string_value = "PRE_INVENTORY")]
    PreInventory,
    #[sea_orm(string_value = "REGISTERED")]
    Registered,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "PACKED")]
    Packed,
    #[sea_orm(string_value = "CONSUMED")]
    Consumed,
    #[sea_orm(string_value = "VOIDED")]
    Voided,
}

impl InventoryStatus {
    /// Statuses from which an item may be packed into a container.
    pub fn is_packable(&self) -> bool {
        matches!(self, InventoryStatus::Registered | InventoryStatus::Active)
    }

    /// Statuses from which an item may be voided.
    pub fn is_voidable(&self) -> bool {
        matches!(
            self,
            InventoryStatus::PreInventory | InventoryStatus::Registered | InventoryStatus::Active
        )
    }
}

/// A serialized or batch-tracked physical instance of a material.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub material_id: Uuid,
    #[sea_orm(unique)]
    pub serial_number: Option<String>,
    pub batch_number: Option<String>,
    pub status: InventoryStatus,
    pub location_id: Option<Uuid>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::material::Entity",
        from = "Column::MaterialId",
        to = "super::material::Column::Id"
    )]
    Material,
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
