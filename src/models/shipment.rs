use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipment status enumeration
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
pub enum ShipmentStatus {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "LOADING")]
    Loading,
    #[sea_orm(string_value = "DISPATCHED")]
    Dispatched,
    #[sea_orm(string_value = "IN_TRANSIT")]
    InTransit,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl ShipmentStatus {
    /// Items can still be added or removed.
    pub fn is_editable(&self) -> bool {
        matches!(self, ShipmentStatus::Created | ShipmentStatus::Loading)
    }

    /// Allowed forward transitions.
    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, next),
            (Created, Loading)
                | (Loading, Dispatched)
                | (Dispatched, InTransit)
                | (Dispatched, Delivered)
                | (InTransit, Delivered)
                | (Created, Cancelled)
                | (Loading, Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub shipment_number: String,
    pub origin_location_id: Uuid,
    pub destination_location_id: Uuid,
    pub carrier: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: ShipmentStatus,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_contact: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub received_by: Option<String>,
    pub created_by: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment_item::Entity")]
    Items,
}

impl Related<super::shipment_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::ShipmentStatus::*;
    use rstest::rstest;

    #[rstest]
    #[case(Created, Loading, true)]
    #[case(Loading, Dispatched, true)]
    #[case(Dispatched, InTransit, true)]
    #[case(Dispatched, Delivered, true)]
    #[case(InTransit, Delivered, true)]
    #[case(Created, Cancelled, true)]
    #[case(Loading, Cancelled, true)]
    #[case(Created, Dispatched, false)]
    #[case(Created, Delivered, false)]
    #[case(Dispatched, Cancelled, false)]
    #[case(Delivered, InTransit, false)]
    #[case(Cancelled, Loading, false)]
    fn shipment_transitions(
        #[case] from: super::ShipmentStatus,
        #[case] to: super::ShipmentStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_pre_dispatch_shipments_are_editable() {
        assert!(Created.is_editable());
        assert!(Loading.is_editable());
        assert!(!Dispatched.is_editable());
        assert!(!Delivered.is_editable());
    }
}
