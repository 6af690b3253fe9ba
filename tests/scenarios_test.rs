mod common;

use std::collections::HashMap;

use assert_matches::assert_matches;
use serde_json::json;

use ilms_api::{
    errors::ServiceError,
    models::{container::ContainerStatus, inventory_item::InventoryStatus, shipment::ShipmentStatus},
    services::{
        label_templates::CreateTemplate,
        shipments::{AddItems, CreateShipment, DispatchShipment},
    },
};

use common::TestApp;

#[tokio::test]
async fn child_locations_are_listed_under_their_parent() {
    let app = TestApp::new().await;

    let children = app
        .services
        .locations
        .get_children(Some(app.warehouse.id))
        .await
        .expect("children");
    let codes: Vec<_> = children.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, vec!["ZN-A"]);

    let roots = app.services.locations.get_children(None).await.expect("roots");
    assert!(roots.iter().any(|l| l.code == "WH-MAIN"));
    assert!(roots.iter().all(|l| l.code != "ZN-A"));
}

#[tokio::test]
async fn container_fills_up_and_refuses_extra_children() {
    let app = TestApp::new().await;
    let boxed = app.create_container("BOX", Some(2)).await;
    let items = app.register_items(3).await;

    for item in &items[..2] {
        let outcome = app
            .services
            .containers
            .pack(boxed.id, "INVENTORY", vec![item.id], None)
            .await
            .expect("pack");
        assert!(outcome.success, "errors: {:?}", outcome.errors);
    }

    let full = app.services.containers.get(boxed.id).await.unwrap();
    assert_eq!(full.status, ContainerStatus::Full);
    assert_eq!(full.current_count, 2);

    let err = app
        .services
        .containers
        .pack(boxed.id, "INVENTORY", vec![items[2].id], None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("full"));

    let leftover = app
        .services
        .inventory
        .get_by_serial(items[2].serial_number.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(leftover.status, InventoryStatus::Registered);
}

#[tokio::test]
async fn rendered_label_substitutes_print_data() {
    let app = TestApp::new().await;
    let template = app
        .services
        .label_templates
        .create(CreateTemplate {
            name: "Carton label".into(),
            level_name: Some("Carton".into()),
            width_mm: 100.0,
            height_mm: 50.0,
            status: None,
            canvas_design: json!({
                "version": 1,
                "elements": [{
                    "id": 1700000000000u64,
                    "type": "text",
                    "x": 10, "y": 10, "width": 200, "height": 30,
                    "formatString": "{materialCode}-{batchNumber}"
                }]
            }),
        })
        .await
        .expect("create template");

    let data = HashMap::from([
        ("materialCode".to_string(), "MAT-1".to_string()),
        ("batchNumber".to_string(), "B7".to_string()),
    ]);
    let label = app
        .services
        .label_templates
        .render(template.id, &data)
        .await
        .expect("render");

    assert_eq!(label.elements.len(), 1);
    assert_eq!(label.elements[0].content, "MAT-1-B7");
    assert_eq!(label.elements[0].id, "1700000000000");
}

#[tokio::test]
async fn dispatched_shipment_can_no_longer_be_edited() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;

    let shipment = app
        .services
        .shipments
        .create(CreateShipment {
            origin_location_id: app.warehouse.id,
            destination_location_id: app.zone.id,
            carrier: Some("DHL".into()),
            expected_delivery_date: None,
            notes: None,
            created_by: Some("tester".into()),
        })
        .await
        .expect("create shipment");
    assert_eq!(shipment.status, ShipmentStatus::Created);

    let outcome = app
        .services
        .shipments
        .add_items(
            shipment.id,
            AddItems {
                item_type: "CONTAINER".into(),
                item_ids: vec![sealed.id],
                actor: None,
            },
        )
        .await
        .expect("add items");
    assert!(outcome.success);
    assert_eq!(outcome.shipment.status, ShipmentStatus::Loading);

    let dispatched = app
        .services
        .shipments
        .dispatch(
            shipment.id,
            DispatchShipment {
                vehicle_number: Some("TRK-42".into()),
                driver_name: Some("Sam".into()),
                driver_contact: Some("+31 6 0000 0000".into()),
                actor: Some("dispatcher".into()),
            },
        )
        .await
        .expect("dispatch");
    assert_eq!(dispatched.status, ShipmentStatus::Dispatched);
    assert!(dispatched.dispatched_at.is_some());
    assert_eq!(dispatched.vehicle_number.as_deref(), Some("TRK-42"));

    let err = app
        .services
        .shipments
        .remove_item(shipment.id, "CONTAINER", sealed.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let shipped = app.services.containers.get(sealed.id).await.unwrap();
    assert_eq!(shipped.status, ContainerStatus::Shipped);
}

#[tokio::test]
async fn concurrent_packs_of_one_child_admit_exactly_one() {
    let app = TestApp::new().await;
    let first = app.create_container("BOX", Some(5)).await;
    let second = app.create_container("BOX", Some(5)).await;
    let item = app.register_items(1).await.remove(0);

    let tasks: Vec<_> = [first.id, second.id]
        .into_iter()
        .map(|container_id| {
            let containers = app.services.containers.clone();
            let child = item.id;
            tokio::spawn(async move {
                containers
                    .pack(container_id, "INVENTORY", vec![child], None)
                    .await
                    .expect("pack call")
            })
        })
        .collect();

    let mut packed = 0;
    let mut refused = 0;
    for task in tasks {
        let outcome = task.await.expect("join");
        packed += outcome.packed.len();
        for e in &outcome.errors {
            assert_eq!(e.kind, ilms_api::errors::ErrorKind::Conflict, "{}", e.message);
            refused += 1;
        }
    }
    assert_eq!(packed, 1);
    assert_eq!(refused, 1);

    let a = app.services.containers.get(first.id).await.unwrap();
    let b = app.services.containers.get(second.id).await.unwrap();
    assert_eq!(a.current_count + b.current_count, 1);
}
