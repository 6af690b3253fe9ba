mod common;

use std::collections::HashMap;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use ilms_api::{
    errors::ServiceError,
    models::location,
    services::{
        locations::{CreateLocation, UpdateLocation},
        shipments::CreateShipment,
    },
};

use common::TestApp;

async fn add_location(app: &TestApp, code: &str, parent: Option<Uuid>) -> location::Model {
    app.services
        .locations
        .create(CreateLocation {
            code: code.into(),
            name: format!("Location {code}"),
            location_type: "BIN".into(),
            parent_id: parent,
            ..Default::default()
        })
        .await
        .expect("create location")
}

fn move_under(parent: Option<Uuid>) -> UpdateLocation {
    UpdateLocation {
        parent_id: Some(parent),
        ..Default::default()
    }
}

#[tokio::test]
async fn moves_that_close_a_loop_are_refused() {
    let app = TestApp::new().await;
    let rack = add_location(&app, "RK-1", Some(app.zone.id)).await;
    let bin = add_location(&app, "BN-1", Some(rack.id)).await;
    let locations = &app.services.locations;

    let err = locations
        .update("WH-MAIN", move_under(Some(bin.id)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("descendants"));

    let err = locations
        .update("ZN-A", move_under(Some(app.zone.id)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    // the refused moves left the tree untouched
    let warehouse = locations.get("WH-MAIN").await.unwrap();
    assert_eq!(warehouse.parent_id, None);

    // a legitimate move re-homes the whole subtree
    let moved = locations
        .update("RK-1", move_under(Some(app.warehouse.id)))
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(app.warehouse.id));
    let children = locations.get_children(Some(rack.id)).await.unwrap();
    assert_eq!(children[0].id, bin.id);

    let err = locations
        .update("RK-1", move_under(Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "parent_id");

    let root = locations.update("RK-1", move_under(None)).await.unwrap();
    assert_eq!(root.parent_id, None);
}

#[tokio::test]
async fn every_non_root_location_has_exactly_one_parent_listing() {
    let app = TestApp::new().await;
    let zone_b = add_location(&app, "ZN-B", Some(app.warehouse.id)).await;
    add_location(&app, "BN-A1", Some(app.zone.id)).await;
    add_location(&app, "BN-A2", Some(app.zone.id)).await;
    add_location(&app, "BN-B1", Some(zone_b.id)).await;
    add_location(&app, "WH-2", None).await;

    let locations = &app.services.locations;
    let all = locations.list().await.unwrap();
    let mut listings: HashMap<Uuid, usize> = HashMap::new();
    for parent in &all {
        for child in locations.get_children(Some(parent.id)).await.unwrap() {
            *listings.entry(child.id).or_default() += 1;
        }
    }
    let roots: Vec<_> = locations
        .get_children(None)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.code)
        .collect();
    assert_eq!(roots, vec!["WH-2", "WH-MAIN"]);

    for location in &all {
        let expected = usize::from(location.parent_id.is_some());
        assert_eq!(
            listings.get(&location.id).copied().unwrap_or(0),
            expected,
            "{} listed under the wrong number of parents",
            location.code
        );
    }
}

#[tokio::test]
async fn locations_with_children_are_not_deleted() {
    let app = TestApp::new().await;
    let locations = &app.services.locations;

    let err = locations.delete("WH-MAIN").await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.attempted == "delete");

    let leaf = add_location(&app, "BN-9", Some(app.zone.id)).await;
    locations.delete(&leaf.code).await.unwrap();
    assert_matches!(locations.get("BN-9").await, Err(ServiceError::NotFound(_)));
    assert_matches!(locations.delete("BN-9").await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn referenced_locations_are_not_deleted() {
    let app = TestApp::new().await;
    let locations = &app.services.locations;

    let stock_bin = add_location(&app, "BN-STOCK", None).await;
    app.services
        .inventory
        .register_batch(ilms_api::services::inventory::RegisterBatch {
            material_code: common::MATERIAL_CODE.into(),
            batch_number: None,
            quantity: 1,
            location_id: Some(stock_bin.id),
            actor: None,
        })
        .await
        .unwrap();
    let err = locations.delete("BN-STOCK").await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("inventory"));

    let dock = add_location(&app, "DOCK-1", None).await;
    app.services
        .shipments
        .create(CreateShipment {
            origin_location_id: app.warehouse.id,
            destination_location_id: dock.id,
            carrier: None,
            expected_delivery_date: NaiveDate::from_ymd_opt(2030, 6, 1),
            notes: None,
            created_by: None,
        })
        .await
        .unwrap();
    let err = locations.delete("DOCK-1").await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("shipments"));

    // the zone holds nothing and has no children
    locations.delete("ZN-A").await.unwrap();
}
