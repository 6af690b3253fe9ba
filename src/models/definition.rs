use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vocabulary a definition value belongs to.
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
pub enum DefinitionType {
    #[sea_orm(string_value = "MATERIAL_TYPE")]
    MaterialType,
    #[sea_orm(string_value = "MATERIAL_CAT")]
    MaterialCat,
    #[sea_orm(string_value = "MATERIAL_CLASS")]
    MaterialClass,
    #[sea_orm(string_value = "LOCATION_TYPE")]
    LocationType,
    #[sea_orm(string_value = "LOCATION_CAT")]
    LocationCat,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "definitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub def_type: DefinitionType,
    pub def_value: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
