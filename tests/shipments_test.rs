mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use ilms_api::{
    errors::{ErrorKind, ServiceError},
    models::{
        container::ContainerStatus,
        shipment::{self, ShipmentStatus},
        shipment_item::ShipmentItemStatus,
        trace_event::TraceEventType,
    },
    services::shipments::{AddItems, CreateShipment, DispatchShipment},
};

use common::TestApp;

async fn new_shipment(app: &TestApp) -> shipment::Model {
    app.services
        .shipments
        .create(CreateShipment {
            origin_location_id: app.warehouse.id,
            destination_location_id: app.zone.id,
            carrier: Some("PostNL".into()),
            expected_delivery_date: NaiveDate::from_ymd_opt(2030, 1, 15),
            notes: None,
            created_by: Some("planner".into()),
        })
        .await
        .expect("create shipment")
}

fn containers(ids: Vec<Uuid>) -> AddItems {
    AddItems {
        item_type: "CONTAINER".into(),
        item_ids: ids,
        actor: Some("loader".into()),
    }
}

#[tokio::test]
async fn shipment_moves_from_creation_to_delivery() {
    let app = TestApp::new().await;
    let first = app.sealed_box().await;
    let second = app.sealed_box().await;
    let shipment = new_shipment(&app).await;
    assert!(shipment.shipment_number.starts_with("SHP-"));

    let loaded = app
        .services
        .shipments
        .add_items(shipment.id, containers(vec![first.id, second.id]))
        .await
        .unwrap();
    assert_eq!(loaded.added.len(), 2);
    assert_eq!(app.services.shipments.item_count(shipment.id).await.unwrap(), 2);

    let after_remove = app
        .services
        .shipments
        .remove_item(shipment.id, "CONTAINER", second.id, None)
        .await
        .unwrap();
    assert_eq!(after_remove.status, ShipmentStatus::Loading);
    assert_eq!(app.services.shipments.item_count(shipment.id).await.unwrap(), 1);

    app.services
        .shipments
        .dispatch(shipment.id, DispatchShipment::default())
        .await
        .unwrap();
    let in_transit = app
        .services
        .shipments
        .mark_in_transit(shipment.id, None)
        .await
        .unwrap();
    assert_eq!(in_transit.status, ShipmentStatus::InTransit);

    let delivered = app
        .services
        .shipments
        .receive(shipment.id, Some("receiver".into()))
        .await
        .unwrap();
    assert_eq!(delivered.status, ShipmentStatus::Delivered);
    assert!(delivered.delivered_at.is_some());
    assert_eq!(delivered.received_by.as_deref(), Some("receiver"));

    let items = app.services.shipments.get_items(shipment.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item.status, ShipmentItemStatus::Delivered);
    assert_eq!(items[0].serial_number.as_deref(), Some(first.serial_number.as_str()));

    // the removed box stayed behind, still sealed
    let left = app.services.containers.get(second.id).await.unwrap();
    assert_eq!(left.status, ContainerStatus::Sealed);

    let history = app
        .services
        .trace
        .get_history(&shipment.shipment_number)
        .await
        .unwrap();
    let kinds: Vec<_> = history.iter().map(|e| e.event_type).collect();
    for expected in [
        TraceEventType::ShipmentCreated,
        TraceEventType::Dispatched,
        TraceEventType::InTransit,
        TraceEventType::Delivered,
    ] {
        assert!(kinds.contains(&expected), "missing {expected}");
    }
}

#[tokio::test]
async fn only_sealed_and_unassigned_containers_are_loaded() {
    let app = TestApp::new().await;
    let open_box = app.create_container("BOX", None).await;
    let sealed = app.sealed_box().await;
    let first = new_shipment(&app).await;
    let second = new_shipment(&app).await;

    let outcome = app
        .services
        .shipments
        .add_items(first.id, containers(vec![open_box.id, sealed.id]))
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.added, vec![sealed.id]);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].current_state.as_deref(), Some("EMPTY"));

    let outcome = app
        .services
        .shipments
        .add_items(second.id, containers(vec![sealed.id]))
        .await
        .unwrap();
    assert!(outcome.added.is_empty());
    assert_eq!(outcome.errors[0].kind, ErrorKind::Conflict);
    assert!(outcome.errors[0].message.contains(&first.shipment_number));
    assert_eq!(outcome.shipment.status, ShipmentStatus::Created);
}

#[tokio::test]
async fn empty_shipments_cannot_be_dispatched() {
    let app = TestApp::new().await;
    let shipment = new_shipment(&app).await;

    let err = app
        .services
        .shipments
        .dispatch(shipment.id, DispatchShipment::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("CREATED"));
}

#[tokio::test]
async fn undispatched_shipments_cannot_be_received() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let shipment = new_shipment(&app).await;
    app.services
        .shipments
        .add_items(shipment.id, containers(vec![sealed.id]))
        .await
        .unwrap();

    let err = app
        .services
        .shipments
        .receive(shipment.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("LOADING"));

    let err = app
        .services
        .shipments
        .mark_in_transit(shipment.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn cancelling_releases_containers_for_another_shipment() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let cancelled = new_shipment(&app).await;
    app.services
        .shipments
        .add_items(cancelled.id, containers(vec![sealed.id]))
        .await
        .unwrap();

    let result = app.services.shipments.cancel(cancelled.id, None).await.unwrap();
    assert_eq!(result.status, ShipmentStatus::Cancelled);
    assert_eq!(app.services.shipments.item_count(cancelled.id).await.unwrap(), 0);

    let err = app.services.shipments.cancel(cancelled.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let next = new_shipment(&app).await;
    let outcome = app
        .services
        .shipments
        .add_items(next.id, containers(vec![sealed.id]))
        .await
        .unwrap();
    assert!(outcome.success);
}

#[tokio::test]
async fn dispatched_shipments_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let shipment = new_shipment(&app).await;
    app.services
        .shipments
        .add_items(shipment.id, containers(vec![sealed.id]))
        .await
        .unwrap();
    app.services
        .shipments
        .dispatch(shipment.id, DispatchShipment::default())
        .await
        .unwrap();

    let err = app.services.shipments.cancel(shipment.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("DISPATCHED"));

    // shipped containers are no longer loadable elsewhere
    let other = new_shipment(&app).await;
    let outcome = app
        .services
        .shipments
        .add_items(other.id, containers(vec![sealed.id]))
        .await
        .unwrap();
    assert_eq!(outcome.errors[0].current_state.as_deref(), Some("SHIPPED"));
}

#[tokio::test]
async fn origin_and_destination_are_validated() {
    let app = TestApp::new().await;

    let err = app
        .services
        .shipments
        .create(CreateShipment {
            origin_location_id: app.warehouse.id,
            destination_location_id: app.warehouse.id,
            carrier: None,
            expected_delivery_date: None,
            notes: None,
            created_by: None,
        })
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::ValidationError { field: Some(f), .. } if f == "destination_location_id"
    );

    let err = app
        .services
        .shipments
        .create(CreateShipment {
            origin_location_id: Uuid::new_v4(),
            destination_location_id: app.zone.id,
            carrier: None,
            expected_delivery_date: None,
            notes: None,
            created_by: None,
        })
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::ValidationError { field: Some(f), .. } if f == "origin_location_id"
    );

    let err = app
        .services
        .shipments
        .remove_item(Uuid::new_v4(), "CONTAINER", Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn a_loaded_box_cannot_be_nested_into_a_pallet() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let shipment = new_shipment(&app).await;
    app.services
        .shipments
        .add_items(shipment.id, containers(vec![sealed.id]))
        .await
        .unwrap();

    let pallet = app.create_container("PALLET", None).await;
    let outcome = app
        .services
        .containers
        .pack(pallet.id, "CONTAINER", vec![sealed.id], None)
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.packed.is_empty());
    assert_eq!(outcome.errors[0].kind, ErrorKind::Conflict);
    assert!(outcome.errors[0].message.contains(&shipment.shipment_number));
    assert_eq!(outcome.container.current_count, 0);
}

#[tokio::test]
async fn a_nested_box_travels_only_with_its_pallet() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let pallet = app.create_container("PALLET", None).await;
    app.services
        .containers
        .pack(pallet.id, "CONTAINER", vec![sealed.id], None)
        .await
        .unwrap();
    let pallet = app.services.containers.seal(pallet.id, None).await.unwrap();

    let shipment = new_shipment(&app).await;
    let outcome = app
        .services
        .shipments
        .add_items(shipment.id, containers(vec![sealed.id, pallet.id]))
        .await
        .unwrap();
    assert_eq!(outcome.added, vec![pallet.id]);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].item_id, sealed.id.to_string());
    assert!(outcome.errors[0].message.contains(&pallet.serial_number));

    app.services
        .shipments
        .dispatch(shipment.id, DispatchShipment::default())
        .await
        .unwrap();
    assert_eq!(app.services.shipments.item_count(shipment.id).await.unwrap(), 1);
}
