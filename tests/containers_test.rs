mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use ilms_api::{
    errors::{ErrorKind, ServiceError},
    models::{
        container::ContainerStatus, inventory_item::InventoryStatus,
        trace_event::TraceEventType,
    },
};

use common::TestApp;

#[tokio::test]
async fn sealing_twice_returns_the_sealed_container() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    assert_eq!(sealed.status, ContainerStatus::Sealed);
    assert!(sealed.sealed_at.is_some());

    let again = app.services.containers.seal(sealed.id, None).await.expect("reseal");
    assert_eq!(again.status, ContainerStatus::Sealed);
    assert_eq!(again.sealed_at, sealed.sealed_at);
    assert_eq!(again.version, sealed.version);

    let history = app
        .services
        .trace
        .get_history(&sealed.serial_number)
        .await
        .unwrap();
    let seals = history
        .iter()
        .filter(|e| e.event_type == TraceEventType::Sealed)
        .count();
    assert_eq!(seals, 1);
}

#[tokio::test]
async fn empty_containers_cannot_be_sealed() {
    let app = TestApp::new().await;
    let empty = app.create_container("PALLET", None).await;
    assert_eq!(empty.status, ContainerStatus::Empty);

    let err = app.services.containers.seal(empty.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("EMPTY"));
}

#[tokio::test]
async fn current_count_tracks_aggregations_through_pack_and_unpack() {
    let app = TestApp::new().await;
    let boxed = app.create_container("BOX", None).await;
    let items = app.register_items(3).await;
    let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

    let outcome = app
        .services
        .containers
        .pack(boxed.id, "INVENTORY", ids.clone(), Some("packer".into()))
        .await
        .unwrap();
    assert_eq!(outcome.packed.len(), 3);
    assert_eq!(outcome.container.current_count, 3);
    // no capacity: never FULL
    assert_eq!(outcome.container.status, ContainerStatus::Partial);

    let unpacked = app
        .services
        .containers
        .unpack(boxed.id, "INVENTORY", vec![ids[0]], None)
        .await
        .unwrap();
    assert!(unpacked.success);
    assert_eq!(unpacked.container.current_count, 2);

    let contents = app.services.containers.get_contents(boxed.id).await.unwrap();
    assert_eq!(contents.len(), 2);
    assert!(contents.iter().all(|c| c.child_status.as_deref() == Some("PACKED")));

    let released = app
        .services
        .inventory
        .get_by_serial(items[0].serial_number.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(released.status, InventoryStatus::Active);

    let empty = app
        .services
        .containers
        .unpack(boxed.id, "INVENTORY", ids[1..].to_vec(), None)
        .await
        .unwrap();
    assert_eq!(empty.container.current_count, 0);
    assert_eq!(empty.container.status, ContainerStatus::Empty);
}

#[tokio::test]
async fn packing_reports_each_refused_child() {
    let app = TestApp::new().await;
    let boxed = app.create_container("BOX", Some(10)).await;
    let items = app.register_items(1).await;
    let missing = Uuid::new_v4();

    let outcome = app
        .services
        .containers
        .pack(boxed.id, "INVENTORY", vec![items[0].id, missing, items[0].id], None)
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.packed, vec![items[0].id]);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(outcome.errors[0].item_id, missing.to_string());
    assert_eq!(outcome.errors[0].kind, ErrorKind::NotFound);
    assert_eq!(outcome.errors[1].kind, ErrorKind::Conflict);
    assert_eq!(outcome.container.current_count, 1);
}

#[tokio::test]
async fn sealed_boxes_nest_into_pallets() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let open_box = app.create_container("BOX", Some(10)).await;
    let pallet = app.create_container("PALLET", Some(4)).await;

    let outcome = app
        .services
        .containers
        .pack(pallet.id, "CONTAINER", vec![sealed.id, open_box.id], None)
        .await
        .unwrap();
    assert_eq!(outcome.packed, vec![sealed.id]);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].message.contains("must be sealed"));

    let contents = app.services.containers.get_contents(pallet.id).await.unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].child_serial.as_deref(), Some(sealed.serial_number.as_str()));

    let itself = app
        .services
        .containers
        .pack(pallet.id, "CONTAINER", vec![pallet.id], None)
        .await
        .unwrap();
    assert_eq!(itself.errors.len(), 1);
}

#[tokio::test]
async fn sealed_containers_refuse_new_children() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    let items = app.register_items(1).await;

    let err = app
        .services
        .containers
        .pack(sealed.id, "INVENTORY", vec![items[0].id], None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("SEALED"));
}

#[tokio::test]
async fn unknown_child_type_is_a_validation_error() {
    let app = TestApp::new().await;
    let boxed = app.create_container("BOX", None).await;

    let err = app
        .services
        .containers
        .pack(boxed.id, "PALLET", vec![Uuid::new_v4()], None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "child_type");
}

#[tokio::test]
async fn containers_are_found_by_serial_and_leave_a_trace() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;
    assert!(sealed.serial_number.starts_with("BOX"));

    let found = app
        .services
        .containers
        .get_by_serial(&sealed.serial_number)
        .await
        .unwrap();
    assert_eq!(found.id, sealed.id);

    let history = app
        .services
        .trace
        .get_history(&sealed.serial_number)
        .await
        .unwrap();
    let kinds: Vec<_> = history.iter().map(|e| e.event_type).collect();
    assert!(kinds.contains(&TraceEventType::ContainerCreated));
    assert!(kinds.contains(&TraceEventType::Sealed));

    let listed = app.services.containers.list(Some("SEALED")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(app.services.containers.list(Some("OPEN")).await.is_err());
}
