use dairyops_core::db::{open_db, open_db_in_memory};
use dairyops_core::model::plan::PlanId;
use dairyops_core::model::task::{Task, TaskField};
use dairyops_core::sync::document::DocumentPath;
use dairyops_core::sync::error::{ServiceErrorCode, StoreError};
use dairyops_core::sync::identity::LocalIdentityProvider;
use dairyops_core::sync::sqlite::SqliteDocumentService;
use dairyops_core::sync::store::{ScheduleStore, SyncState};
use dairyops_core::PlannerConfig;
use serde_json::json;
use std::path::Path;

fn open_store(db: &Path, plan: &str) -> ScheduleStore<SqliteDocumentService> {
    let config = PlannerConfig {
        default_plan_id: plan.to_string(),
        ..PlannerConfig::default()
    };
    let service = SqliteDocumentService::new(open_db(db).unwrap());
    let mut store = ScheduleStore::new(&config, service);
    store
        .authenticate(&LocalIdentityProvider::new("local-operator"), None)
        .unwrap();
    store.activate(config.plan_id());
    while store.process_events() > 0 {}
    store
}

#[test]
fn read_reports_missing_then_found() {
    let service = SqliteDocumentService::new(open_db_in_memory().unwrap());
    let path = DocumentPath::new("artifacts/a/users/u/day_planner_data/p");

    let missing = service.read(&path).unwrap();
    assert!(!missing.exists);
    assert!(missing.data.is_none());

    let store_path = DocumentPath::for_plan("a", "u", &PlanId::new("p").unwrap());
    assert_eq!(store_path, path);
}

#[test]
fn schedule_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dairyops.sqlite3");

    let mut store = open_store(&db, "north-barn");
    assert_eq!(store.state(), SyncState::Synced);
    assert_eq!(store.tasks().len(), 8);
    let first = store.tasks()[0].id.clone();
    store
        .edit_task(&first, TaskField::Label, "Dawn Milking")
        .unwrap();
    let added = store.insert_after(&first, "Team A").unwrap();
    while store.process_events() > 0 {}
    assert!(store.status().is_none());
    drop(store);

    let reopened = open_store(&db, "north-barn");
    assert_eq!(reopened.tasks().len(), 9);
    assert_eq!(reopened.tasks()[0].label, "Dawn Milking");
    assert_eq!(reopened.tasks()[1].id, added);
}

#[test]
fn plan_paths_are_listed_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dairyops.sqlite3");
    drop(open_store(&db, "north-barn"));
    drop(open_store(&db, "south-barn"));

    let service = SqliteDocumentService::new(open_db(&db).unwrap());
    let prefix = DocumentPath::plan_prefix("dairy-planner-production", "local-operator");
    let plans: Vec<String> = service
        .paths_with_prefix(&prefix)
        .unwrap()
        .into_iter()
        .map(|path| path.as_str().trim_start_matches(prefix.as_str()).to_string())
        .collect();
    assert_eq!(plans, vec!["north-barn", "south-barn"]);

    let other_user = DocumentPath::plan_prefix("dairy-planner-production", "someone-else");
    assert!(service.paths_with_prefix(&other_user).unwrap().is_empty());
}

#[test]
fn corrupt_document_body_surfaces_as_sync_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dairyops.sqlite3");
    let path = DocumentPath::for_plan(
        "dairy-planner-production",
        "local-operator",
        &PlanId::new("north-barn").unwrap(),
    );

    let conn = open_db(&db).unwrap();
    conn.execute(
        "INSERT INTO documents (path, body) VALUES (?1, 'not json');",
        [path.as_str()],
    )
    .unwrap();
    let service = SqliteDocumentService::new(conn);
    let err = service.read(&path).unwrap_err();
    assert_eq!(err.code, ServiceErrorCode::Internal);
    drop(service);

    let store = open_store(&db, "north-barn");
    assert!(matches!(store.status(), Some(StoreError::GenericSync(_))));
    assert_eq!(store.tasks().len(), 8);
}

#[test]
fn stored_body_is_the_plan_document_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dairyops.sqlite3");
    let mut store = open_store(&db, "calving");
    let id = store.tasks()[0].id.clone();
    store.delete_task(&id).unwrap();
    while store.process_events() > 0 {}
    drop(store);

    let service = SqliteDocumentService::new(open_db(&db).unwrap());
    let path = DocumentPath::for_plan(
        "dairy-planner-production",
        "local-operator",
        &PlanId::new("calving").unwrap(),
    );
    let snapshot = service.read(&path).unwrap();
    let data = snapshot.data.unwrap();
    let tasks = data["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 7);
    assert_eq!(tasks[0]["task"], json!("Milk Collection"));
    assert!(tasks[0].get("label").is_none());
    assert!(data["lastUpdated"].as_i64().unwrap() > 0);

    let stored: Task = serde_json::from_value(tasks[0].clone()).unwrap();
    assert_eq!(stored.resource, "Tanker 1");
}
