use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One tier of a packaging hierarchy. `level_order` 1 is the innermost unit;
/// `capacity` is how many next-inner units one unit of this level holds.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packaging_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub hierarchy_id: Uuid,
    pub level_name: String,
    pub level_order: i32,
    pub capacity: Option<i32>,
    pub label_template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::packaging_hierarchy::Entity",
        from = "Column::HierarchyId",
        to = "super::packaging_hierarchy::Column::Id",
        on_delete = "Cascade"
    )]
    Hierarchy,
    #[sea_orm(
        belongs_to = "super::label_template::Entity",
        from = "Column::LabelTemplateId",
        to = "super::label_template::Column::Id",
        on_delete = "SetNull"
    )]
    LabelTemplate,
}

impl Related<super::packaging_hierarchy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hierarchy.def()
    }
}

impl Related<super::label_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabelTemplate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
