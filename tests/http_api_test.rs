mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{id_of, response_json, TestApp, MATERIAL_CODE};

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn location_tree_is_served_over_http() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/locations/WH-MAIN/children", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["code"], "ZN-A");

    let response = app
        .request(Method::GET, "/api/v1/locations/NOWHERE", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn container_lifecycle_over_http() {
    let app = TestApp::new().await;
    let items = app.register_items(2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/containers",
            Some(json!({
                "container_type": "BOX",
                "capacity": 1,
                "location_id": app.warehouse.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let container_id = id_of(&body);
    assert_eq!(body["data"]["status"], "EMPTY");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/containers/{container_id}/pack"),
            Some(json!({
                "child_type": "INVENTORY",
                "child_ids": [items[0].id],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["container"]["status"], "FULL");

    // container is full now: the whole call is refused
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/containers/{container_id}/pack"),
            Some(json!({
                "child_type": "INVENTORY",
                "child_ids": [items[1].id],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["current_state"], "FULL");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/containers/{container_id}/seal"),
            Some(json!({"actor": "packer"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "SEALED");

    let serial = body["data"]["serial_number"].as_str().unwrap().to_string();
    let response = app
        .request(Method::GET, &format!("/api/v1/trace/{serial}"), None)
        .await;
    let body = response_json(response).await;
    assert!(body["data"].as_array().is_some_and(|events| events.len() >= 2));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/containers/{container_id}/contents"),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"][0]["child_id"], items[0].id.to_string());
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/containers",
            Some(json!({
                "container_type": "CRATE",
                "location_id": app.warehouse.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["field"], "container_type");

    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory/scan",
            Some(json!({"location_id": app.zone.id})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["field"], "serial_number");
}

#[tokio::test]
async fn repeated_idempotency_key_replays_the_first_response() {
    let app = TestApp::new().await;
    let payload = json!({
        "container_type": "PALLET",
        "location_id": app.warehouse.id,
    });
    let headers = [("Idempotency-Key", "create-pallet-1")];

    let first = app
        .request_with_headers(Method::POST, "/api/v1/containers", Some(payload.clone()), &headers)
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert!(first.headers().get("idempotent-replay").is_none());
    let first_body = response_json(first).await;

    let second = app
        .request_with_headers(Method::POST, "/api/v1/containers", Some(payload.clone()), &headers)
        .await;
    assert_eq!(second.status(), StatusCode::CREATED);
    assert_eq!(
        second.headers().get("idempotent-replay").and_then(|v| v.to_str().ok()),
        Some("true")
    );
    let second_body = response_json(second).await;
    assert_eq!(id_of(&first_body), id_of(&second_body));

    let all = app.services.containers.list(None).await.unwrap();
    assert_eq!(all.len(), 1);

    // same key on a different operation is refused
    let response = app
        .request_with_headers(
            Method::POST,
            "/api/v1/shipments",
            Some(json!({
                "origin_location_id": app.warehouse.id,
                "destination_location_id": app.zone.id,
            })),
            &headers,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // without a key the request runs again
    let third = app
        .request(Method::POST, "/api/v1/containers", Some(payload))
        .await;
    assert_eq!(third.status(), StatusCode::CREATED);
    assert_eq!(app.services.containers.list(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn shipments_are_created_loaded_and_dispatched_over_http() {
    let app = TestApp::new().await;
    let sealed = app.sealed_box().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/shipments",
            Some(json!({
                "origin_location_id": app.warehouse.id,
                "destination_location_id": app.zone.id,
                "carrier": "DHL",
                "expected_delivery_date": "2030-03-01",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let shipment_id = id_of(&response_json(response).await);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{shipment_id}/items"),
            Some(json!({"item_ids": [sealed.id]})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["shipment"]["status"], "LOADING");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{shipment_id}/dispatch"),
            Some(json!({"vehicle_number": "TRK-1", "driver_name": "Alex"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "DISPATCHED");
    assert!(body["data"]["dispatched_at"].is_string());

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/shipments/{shipment_id}/items/{}", sealed.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{shipment_id}/receive"),
            Some(json!({"actor": "dock-2"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "DELIVERED");
    assert_eq!(body["data"]["received_by"], "dock-2");
}

#[tokio::test]
async fn pre_registered_labels_are_confirmed_by_scan() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory/pre-register",
            Some(json!({
                "material_code": MATERIAL_CODE,
                "serials": ["LBL-001", "LBL-002"],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let scan = json!({"serial_number": "LBL-001", "location_id": app.zone.id});
    let response = app
        .request(Method::POST, "/api/v1/inventory/scan", Some(scan.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "ACTIVE");

    let response = app
        .request(Method::POST, "/api/v1/inventory/scan", Some(scan))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["current_state"], "ACTIVE");

    let response = app
        .request(Method::GET, "/api/v1/inventory?status=PRE_INVENTORY", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn label_templates_render_posted_data() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/label-templates",
            Some(json!({
                "name": "Pallet",
                "width_mm": 150.0,
                "height_mm": 100.0,
                "canvas_design": {"version": 1, "elements": [
                    {"id": "t", "type": "text", "x": 0, "y": 0, "width": 100, "height": 20,
                     "formatString": "{materialCode}-{batchNumber}"}
                ]},
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let template_id = id_of(&response_json(response).await);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/label-templates/{template_id}/render"),
            Some(json!({"materialCode": "MAT-1", "batchNumber": "B7"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["elements"][0]["content"], "MAT-1-B7");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/label-templates/{template_id}/render"),
            Some(json!(["not", "an", "object"])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/label-templates/{template_id}/imposition?paper=letter&total=12"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["labels_per_sheet"], 2);
    assert_eq!(body["data"]["sheets"], 6);
}

#[tokio::test]
async fn concurrent_requests_with_one_key_create_one_container() {
    let app = TestApp::new().await;
    let payload = json!({
        "container_type": "BOX",
        "location_id": app.warehouse.id,
    });
    let headers = [("Idempotency-Key", "k-123")];

    let (first, second) = tokio::join!(
        app.request_with_headers(Method::POST, "/api/v1/containers", Some(payload.clone()), &headers),
        app.request_with_headers(Method::POST, "/api/v1/containers", Some(payload.clone()), &headers),
    );

    let statuses = [first.status(), second.status()];
    let replayed = [&first, &second]
        .iter()
        .filter(|r| r.headers().get("idempotent-replay").is_some())
        .count();
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let in_progress = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    // the loser either replays the winner's response or is told to retry
    assert_eq!(created + in_progress, 2, "unexpected statuses {statuses:?}");
    assert!(created >= 1);
    assert_eq!(replayed, created - 1);

    let all = app.services.containers.list(None).await.unwrap();
    assert_eq!(all.len(), 1);

    // once the first request finished the key replays
    let again = app
        .request_with_headers(Method::POST, "/api/v1/containers", Some(payload), &headers)
        .await;
    assert_eq!(again.status(), StatusCode::CREATED);
    assert_eq!(id_of(&response_json(again).await), all[0].id);
}

#[tokio::test]
async fn oversized_label_plans_are_a_bad_request() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/packaging/hierarchies",
            Some(json!({"name": "Bulk"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let hierarchy_id = id_of(&response_json(response).await);

    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/packaging/hierarchies/{hierarchy_id}/label-plan?total_items={}",
                i64::MAX
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["field"], "total_items");
}
