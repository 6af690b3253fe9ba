mod common;

use assert_matches::assert_matches;

use ilms_api::{
    errors::ServiceError,
    models::{inventory_item::InventoryStatus, trace_event::TraceEventType},
    services::inventory::{ConfirmScan, PreRegister, RegisterBatch},
};

use common::{TestApp, MATERIAL_CODE};

fn pre_register(serials: &[&str]) -> PreRegister {
    PreRegister {
        material_code: MATERIAL_CODE.into(),
        serials: serials.iter().map(|s| s.to_string()).collect(),
        batch_number: Some("LOT-9".into()),
    }
}

#[tokio::test]
async fn registered_batches_get_unique_serials() {
    let app = TestApp::new().await;
    let items = app.register_items(25).await;

    let mut serials: Vec<_> = items
        .iter()
        .map(|i| i.serial_number.clone().expect("serial"))
        .collect();
    serials.sort();
    serials.dedup();
    assert_eq!(serials.len(), 25);
    assert!(items.iter().all(|i| i.status == InventoryStatus::Registered));
    assert!(items.iter().all(|i| i.location_id == Some(app.warehouse.id)));

    let listed = app.services.inventory.list(Some("REGISTERED")).await.unwrap();
    assert_eq!(listed.len(), 25);
}

#[tokio::test]
async fn batch_registration_validates_quantity_and_material() {
    let app = TestApp::new().await;

    let err = app
        .services
        .inventory
        .register_batch(RegisterBatch {
            material_code: MATERIAL_CODE.into(),
            batch_number: None,
            quantity: 0,
            location_id: None,
            actor: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { .. });

    let err = app
        .services
        .inventory
        .register_batch(RegisterBatch {
            material_code: "NOPE".into(),
            batch_number: None,
            quantity: 1,
            location_id: None,
            actor: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn scanning_a_pre_registered_label_activates_it_once() {
    let app = TestApp::new().await;
    let created = app
        .services
        .inventory
        .pre_register(pre_register(&["SN-0001", "SN-0002"]))
        .await
        .expect("pre-register");
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|i| i.status == InventoryStatus::PreInventory));

    let scan = ConfirmScan {
        serial_number: Some(" SN-0001 ".into()),
        location_id: Some(app.zone.id),
        actor: Some("scanner-7".into()),
    };
    let active = app.services.inventory.confirm_scan(scan.clone()).await.expect("confirm");
    assert_eq!(active.status, InventoryStatus::Active);
    assert_eq!(active.location_id, Some(app.zone.id));
    assert_eq!(active.version, created[0].version + 1);

    let err = app.services.inventory.confirm_scan(scan).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("already confirmed"));

    let history = app.services.trace.get_history("SN-0001").await.unwrap();
    let kinds: Vec<_> = history.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&TraceEventType::ItemCreated));
    assert!(kinds.contains(&TraceEventType::ScanConfirmed));
    let scan_event = history
        .iter()
        .find(|e| e.event_type == TraceEventType::ScanConfirmed)
        .unwrap();
    assert_eq!(scan_event.location.as_deref(), Some("ZN-A"));
    assert_eq!(scan_event.actor.as_deref(), Some("scanner-7"));
}

#[tokio::test]
async fn scanning_requires_serial_and_known_location() {
    let app = TestApp::new().await;
    app.services
        .inventory
        .pre_register(pre_register(&["SN-0100"]))
        .await
        .unwrap();

    let err = app
        .services
        .inventory
        .confirm_scan(ConfirmScan {
            location_id: Some(app.zone.id),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "serial_number");

    let err = app
        .services
        .inventory
        .confirm_scan(ConfirmScan {
            serial_number: Some("SN-0100".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "location_id");

    let err = app
        .services
        .inventory
        .confirm_scan(ConfirmScan {
            serial_number: Some("SN-0100".into()),
            location_id: Some(uuid::Uuid::new_v4()),
            actor: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "location_id");

    let err = app
        .services
        .inventory
        .confirm_scan(ConfirmScan {
            serial_number: Some("SN-UNKNOWN".into()),
            location_id: Some(app.zone.id),
            actor: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn voided_items_cannot_be_confirmed() {
    let app = TestApp::new().await;
    app.services
        .inventory
        .pre_register(pre_register(&["SN-0200"]))
        .await
        .unwrap();

    let voided = app
        .services
        .inventory
        .void("SN-0200", Some("qa".into()))
        .await
        .expect("void");
    assert_eq!(voided.status, InventoryStatus::Voided);

    let err = app
        .services
        .inventory
        .confirm_scan(ConfirmScan {
            serial_number: Some("SN-0200".into()),
            location_id: Some(app.zone.id),
            actor: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("voided"));

    let err = app.services.inventory.void("SN-0200", None).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("VOIDED"));
}

#[tokio::test]
async fn pre_registration_rejects_duplicates() {
    let app = TestApp::new().await;

    let err = app
        .services
        .inventory
        .pre_register(pre_register(&["SN-1", "SN-1"]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "serials");

    let err = app
        .services
        .inventory
        .pre_register(pre_register(&["SN-2", "  "]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { .. });

    app.services
        .inventory
        .pre_register(pre_register(&["SN-3"]))
        .await
        .unwrap();
    let err = app
        .services
        .inventory
        .pre_register(pre_register(&["SN-4", "SN-3"]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.message.contains("SN-3"));

    // the failed batch is rolled back as a whole
    let err = app.services.inventory.get_by_serial("SN-4").await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn packed_items_cannot_be_voided() {
    let app = TestApp::new().await;
    let boxed = app.create_container("BOX", None).await;
    let item = app.register_items(1).await.remove(0);
    app.services
        .containers
        .pack(boxed.id, "INVENTORY", vec![item.id], None)
        .await
        .unwrap();

    let serial = item.serial_number.unwrap();
    let err = app.services.inventory.void(&serial, None).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(c) if c.current.as_deref() == Some("PACKED"));
}
