mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use ilms_api::{
    errors::ServiceError,
    models::definition::DefinitionType,
    services::definitions::CreateDefinition,
};

use common::TestApp;

fn definition(def_type: &str, value: &str) -> CreateDefinition {
    CreateDefinition {
        def_type: def_type.into(),
        def_value: value.into(),
        description: None,
    }
}

#[tokio::test]
async fn definitions_are_listed_by_type_then_value() {
    let app = TestApp::new().await;
    let definitions = &app.services.definitions;
    for (def_type, value) in [
        ("MATERIAL_TYPE", "RAW"),
        ("LOCATION_TYPE", "ZONE"),
        ("LOCATION_TYPE", "BIN"),
        ("MATERIAL_TYPE", "FINISHED_GOOD"),
    ] {
        definitions.create(definition(def_type, value)).await.unwrap();
    }

    let all = definitions.list(None).await.unwrap();
    let values: Vec<_> = all.iter().map(|d| d.def_value.as_str()).collect();
    assert_eq!(values, vec!["BIN", "ZONE", "FINISHED_GOOD", "RAW"]);

    let locations = definitions.list(Some("location_type")).await.unwrap();
    assert_eq!(locations.len(), 2);
    assert!(locations.iter().all(|d| d.def_type == DefinitionType::LocationType));

    let err = definitions.list(Some("COLOUR")).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "def_type");
}

#[tokio::test]
async fn duplicate_pairs_conflict_but_values_repeat_across_types() {
    let app = TestApp::new().await;
    let definitions = &app.services.definitions;

    definitions.create(definition("LOCATION_CAT", "STORAGE")).await.unwrap();
    let err = definitions
        .create(definition("LOCATION_CAT", " STORAGE "))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    definitions.create(definition("MATERIAL_CAT", "STORAGE")).await.unwrap();

    let err = definitions.create(definition("LOCATION_CAT", "   ")).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError { field: Some(f), .. } if f == "def_value");
}

#[tokio::test]
async fn deleted_definitions_are_no_longer_registered() {
    let app = TestApp::new().await;
    let definitions = &app.services.definitions;
    let created = definitions.create(definition("LOCATION_TYPE", "DOCK")).await.unwrap();
    assert!(definitions
        .is_registered(DefinitionType::LocationType, "DOCK")
        .await
        .unwrap());

    definitions.delete(created.id).await.unwrap();
    assert!(!definitions
        .is_registered(DefinitionType::LocationType, "DOCK")
        .await
        .unwrap());

    let err = definitions.delete(created.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
    let err = definitions.delete(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
