use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
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
pub enum SubjectType {
    #[sea_orm(string_value = "INVENTORY")]
    Inventory,
    #[sea_orm(string_value = "CONTAINER")]
    Container,
    #[sea_orm(string_value = "SHIPMENT")]
    Shipment,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
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
pub enum TraceEventType {
    #[sea_orm(string_value = "ITEM_CREATED")]
    ItemCreated,
    #[sea_orm(string_value = "SCAN_CONFIRMED")]
    ScanConfirmed,
    #[sea_orm(string_value = "ITEM_VOIDED")]
    ItemVoided,
    #[sea_orm(string_value = "CONTAINER_CREATED")]
    ContainerCreated,
    #[sea_orm(string_value = "PACKED")]
    Packed,
    #[sea_orm(string_value = "UNPACKED")]
    Unpacked,
    #[sea_orm(string_value = "SEALED")]
    Sealed,
    #[sea_orm(string_value = "SHIPMENT_CREATED")]
    ShipmentCreated,
    #[sea_orm(string_value = "LOADED")]
    Loaded,
    #[sea_orm(string_value = "UNLOADED")]
    Unloaded,
    #[sea_orm(string_value = "DISPATCHED")]
    Dispatched,
    #[sea_orm(string_value = "IN_TRANSIT")]
    InTransit,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Append-only history entry. Written in the same transaction as the state
/// change it records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trace_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
    pub subject_serial: Option<String>,
    pub event_type: TraceEventType,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
