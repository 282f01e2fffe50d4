use dairyops_core::model::plan::{PlanDocument, PlanId};
use dairyops_core::model::task::{default_schedule, Task, TaskDraft, TaskField, TaskId};
use dairyops_core::sync::document::DocumentPath;
use dairyops_core::sync::error::{ServiceError, ServiceErrorCode, StoreError};
use dairyops_core::sync::identity::{LocalIdentityProvider, UserIdentity};
use dairyops_core::sync::memory::MemoryDocumentService;
use dairyops_core::sync::store::{ChangeOrigin, ScheduleStore, StoreChange, SyncState};
use dairyops_core::PlannerConfig;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

const USER: &str = "operator-1";

fn config() -> PlannerConfig {
    PlannerConfig::default()
}

fn plan(id: &str) -> PlanId {
    PlanId::new(id).unwrap()
}

fn path_of(plan_id: &PlanId) -> DocumentPath {
    DocumentPath::for_plan(&config().app_id, USER, plan_id)
}

fn document_with(tasks: &[Task]) -> serde_json::Value {
    PlanDocument::snapshot_of(tasks, 1_700_000_000_000)
        .to_value()
        .unwrap()
}

fn stored_tasks(service: &MemoryDocumentService, path: &DocumentPath) -> Vec<Task> {
    let value = service.document(path).expect("document should exist");
    PlanDocument::from_value(value).unwrap().tasks.unwrap()
}

fn synced_store(
    service: &MemoryDocumentService,
    tasks: Vec<Task>,
) -> ScheduleStore<MemoryDocumentService> {
    let mut store = ScheduleStore::with_tasks(&config(), service.clone(), tasks);
    store.set_identity(UserIdentity::new(USER, false));
    store.activate(config().plan_id());
    settle(service, &mut store);
    store
}

fn settle(service: &MemoryDocumentService, store: &mut ScheduleStore<MemoryDocumentService>) {
    while service.flush() + store.process_events() > 0 {}
}

fn labels(store: &ScheduleStore<MemoryDocumentService>) -> Vec<String> {
    store.tasks().iter().map(|task| task.label.clone()).collect()
}

#[test]
fn missing_document_is_created_with_exactly_one_write() {
    let service = MemoryDocumentService::new();
    let store = synced_store(&service, default_schedule());
    let path = path_of(store.plan_id());

    assert_eq!(store.state(), SyncState::Synced);
    assert_eq!(service.writes_to(&path), 1);
    assert_eq!(stored_tasks(&service, &path), store.tasks());
    assert!(store.status().is_none());
}

#[test]
fn deleted_document_is_recreated_with_exactly_one_write() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    let path = path_of(store.plan_id());
    assert_eq!(service.writes_to(&path), 1);

    service.remove_document(&path);
    settle(&service, &mut store);

    assert_eq!(service.writes_to(&path), 2);
    assert_eq!(stored_tasks(&service, &path), store.tasks());
    assert_default_day(&store);
    assert!(store.status().is_none());
}

#[test]
fn snapshot_with_numeric_ids_is_applied_and_ids_keep_their_type() {
    let service = MemoryDocumentService::new();
    let path = path_of(&config().plan_id());
    service.put_document(
        &path,
        json!({
            "tasks": [
                { "id": 1700000000000_u64, "resource": "Team A", "task": "Morning Milking", "start": "02:30", "end": "05:30" },
                { "id": 1700000000001_u64, "resource": "Tanker 1", "task": "Milk Collection", "start": "05:00", "end": "06:30" }
            ],
            "lastUpdated": 1700000000000_u64
        }),
    );

    let mut store = synced_store(&service, default_schedule());
    assert!(store.status().is_none());
    assert_eq!(labels(&store), vec!["Morning Milking", "Milk Collection"]);
    let first = TaskId::number(1_700_000_000_000_u64);
    assert_eq!(store.tasks()[0].id, first);

    store.edit_task(&first, TaskField::End, "06:00").unwrap();
    settle(&service, &mut store);

    let stored = service.document(&path).unwrap();
    assert_eq!(stored["tasks"][0]["id"], json!(1700000000000_u64));
    assert_eq!(stored["tasks"][0]["end"], json!("06:00"));
    assert_eq!(stored["tasks"][1]["id"], json!(1700000000001_u64));
    assert!(store.status().is_none());
}

#[test]
fn existing_document_replaces_local_tasks_without_writing() {
    let service = MemoryDocumentService::new();
    let remote = vec![Task::new("Team B", "Feeding Cows", "09:00", "10:30")];
    service.put_document(&path_of(&config().plan_id()), document_with(&remote));

    let store = synced_store(&service, default_schedule());

    assert_eq!(store.tasks(), remote.as_slice());
    assert!(service.writes().is_empty());
}

#[test]
fn insert_after_places_row_directly_after_target() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(
        &service,
        vec![
            Task::new("Team A", "first", "02:00", "03:00"),
            Task::new("Team A", "second", "03:00", "04:00"),
            Task::new("Team B", "third", "04:00", "05:00"),
        ],
    );
    let second = store.tasks()[1].id.clone();

    let inserted = store.insert_after(&second, "Team A").unwrap();
    settle(&service, &mut store);

    assert_eq!(labels(&store), vec!["first", "second", "", "third"]);
    let row = store.task(&inserted).unwrap();
    assert_eq!((row.start.as_str(), row.end.as_str()), ("08:00", "09:00"));
    assert_eq!(row.resource, "Team A");
    assert_eq!(stored_tasks(&service, &path_of(store.plan_id())), store.tasks());
}

#[test]
fn mutations_on_unknown_ids_write_nothing() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    let writes_before = service.writes().len();
    let stranger = Task::new("Ghost", "", "08:00", "09:00").id;

    assert!(store.edit_task(&stranger, TaskField::Label, "x").is_err());
    assert!(store.insert_after(&stranger, "Ghost").is_err());
    assert!(store.delete_task(&stranger).is_err());
    settle(&service, &mut store);

    assert_eq!(service.writes().len(), writes_before);
    assert_default_day(&store);
}

fn assert_default_day(store: &ScheduleStore<MemoryDocumentService>) {
    let expected: Vec<(String, String)> = default_schedule()
        .into_iter()
        .map(|task| (task.resource, task.label))
        .collect();
    let actual: Vec<(String, String)> = store
        .tasks()
        .iter()
        .map(|task| (task.resource.clone(), task.label.clone()))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn add_uses_filter_text_when_draft_has_no_resource() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, Vec::new());

    let id = store
        .add_task(
            TaskDraft {
                label: "Hoof trim".to_string(),
                ..TaskDraft::default()
            },
            "Team C",
        )
        .unwrap();
    assert!(store
        .add_task(TaskDraft::default(), "")
        .is_err());
    settle(&service, &mut store);

    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.task(&id).unwrap().resource, "Team C");
}

#[test]
fn switching_plans_discards_snapshots_of_the_old_plan() {
    let service = MemoryDocumentService::deferred();
    let plan_a = plan("north-barn");
    let plan_b = plan("south-barn");
    let a_tasks = vec![Task::new("Team A", "North milking", "02:30", "05:30")];
    service.put_document(&path_of(&plan_a), document_with(&a_tasks));
    service.flush();

    let mut store = ScheduleStore::with_tasks(&config(), service.clone(), Vec::new());
    store.set_identity(UserIdentity::new(USER, false));
    store.activate(plan_a.clone());
    store.activate(plan_b.clone());
    assert!(store.tasks().is_empty());

    settle(&service, &mut store);

    assert_eq!(store.plan_id(), &plan_b);
    assert!(store.tasks().is_empty());
    assert_eq!(service.writes_to(&path_of(&plan_a)), 0);
    assert_eq!(service.writes_to(&path_of(&plan_b)), 1);
    assert_eq!(stored_tasks(&service, &path_of(&plan_a)), a_tasks);
    assert_eq!(service.subscriber_count(), 1);
}

#[test]
fn late_remote_update_for_old_plan_is_ignored() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    let old_path = path_of(store.plan_id());

    store.activate(plan("calving-week"));
    settle(&service, &mut store);
    service.put_document(
        &old_path,
        document_with(&[Task::new("Team Z", "stale", "01:00", "02:00")]),
    );
    settle(&service, &mut store);

    assert!(store.tasks().is_empty());
}

#[test]
fn two_clients_converge_on_the_same_plan() {
    let service = MemoryDocumentService::new();
    let mut first = synced_store(&service, Vec::new());
    let mut second = synced_store(&service, Vec::new());

    first
        .add_task(
            TaskDraft {
                resource: "Logistics".to_string(),
                label: "City Delivery".to_string(),
                start: "11:30".to_string(),
                end: "15:30".to_string(),
            },
            "",
        )
        .unwrap();
    settle(&service, &mut first);
    settle(&service, &mut second);
    assert_eq!(first.tasks(), second.tasks());
    assert_eq!(second.tasks().len(), 1);

    let external = vec![Task::new("Cleaning", "Equipment Sanitize", "19:30", "21:00")];
    service.put_document(&path_of(first.plan_id()), document_with(&external));
    settle(&service, &mut first);
    settle(&service, &mut second);
    assert_eq!(first.tasks(), external.as_slice());
    assert_eq!(second.tasks(), external.as_slice());
}

#[test]
fn slow_local_write_overwrites_a_newer_remote_snapshot() {
    let service = MemoryDocumentService::deferred();
    let mut store = synced_store(&service, default_schedule());
    let path = path_of(store.plan_id());
    let remote = vec![Task::new("Team B", "Feeding Cows", "09:00", "10:30")];

    service.put_document(&path, document_with(&remote));
    let id = store.tasks()[0].id.clone();
    store.edit_task(&id, TaskField::Label, "Dawn Milking").unwrap();
    // Remote snapshot, then the write settlement and its echo.
    assert_eq!(service.pending_count(), 3);

    assert!(service.flush_one());
    store.process_events();
    assert_eq!(store.tasks(), remote.as_slice());
    assert!(store.is_saving());

    settle(&service, &mut store);
    assert_eq!(service.pending_count(), 0);
    assert_eq!(store.tasks()[0].label, "Dawn Milking");
    assert_eq!(store.tasks().len(), 8);
    assert_eq!(stored_tasks(&service, &path), store.tasks());
    assert!(store.status().is_none());
}

#[test]
fn failed_write_keeps_local_edit_and_sets_sticky_status_until_next_success() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    let id = store.tasks()[0].id.clone();

    service.fail_writes(Some(ServiceError::new(
        ServiceErrorCode::Unavailable,
        "offline",
    )));
    store.edit_task(&id, TaskField::Start, "03:00").unwrap();
    settle(&service, &mut store);

    assert_eq!(store.task(&id).unwrap().start, "03:00");
    assert!(matches!(store.status(), Some(StoreError::SaveFailure(_))));
    assert_eq!(store.status().unwrap().user_message(), "Save failed");
    assert_eq!(store.writes_in_flight(), 0);

    service.fail_writes(None);
    store.edit_task(&id, TaskField::End, "06:00").unwrap();
    settle(&service, &mut store);

    assert!(store.status().is_none());
    let stored = stored_tasks(&service, &path_of(store.plan_id()));
    assert_eq!(stored[0].start, "03:00");
    assert_eq!(stored[0].end, "06:00");
}

#[test]
fn stale_write_failure_does_not_mark_the_new_plan() {
    let service = MemoryDocumentService::deferred();
    let mut store = ScheduleStore::with_tasks(&config(), service.clone(), default_schedule());
    store.set_identity(UserIdentity::new(USER, false));
    store.activate(config().plan_id());
    settle(&service, &mut store);

    service.fail_writes(Some(ServiceError::new(ServiceErrorCode::Internal, "boom")));
    let id = store.tasks()[0].id.clone();
    store.delete_task(&id).unwrap();
    assert_eq!(store.writes_in_flight(), 1);

    service.fail_writes(None);
    store.activate(plan("heifer-barn"));
    settle(&service, &mut store);

    assert_eq!(store.writes_in_flight(), 0);
    assert!(store.status().is_none());
    assert_eq!(store.state(), SyncState::Synced);
}

#[test]
fn permission_denied_is_reported_separately_from_generic_failures() {
    let service = MemoryDocumentService::new();
    service.fail_subscriptions(Some(ServiceError::new(
        ServiceErrorCode::PermissionDenied,
        "rules reject read",
    )));
    let mut store = ScheduleStore::new(&config(), service.clone());
    store.set_identity(UserIdentity::new(USER, false));
    store.activate(config().plan_id());
    settle(&service, &mut store);

    let denied = store.status().cloned().expect("status should be set");
    assert!(matches!(denied, StoreError::PermissionDenied(_)));
    assert_default_day(&store);

    service.fail_subscriptions(Some(ServiceError::new(
        ServiceErrorCode::Unavailable,
        "no route",
    )));
    store.reload();
    settle(&service, &mut store);
    let generic = store.status().cloned().expect("status should be set");
    assert!(matches!(generic, StoreError::GenericSync(_)));
    assert_ne!(denied.user_message(), generic.user_message());

    service.fail_subscriptions(None);
    store.reload();
    settle(&service, &mut store);
    assert!(store.status().is_none());
    assert_eq!(store.state(), SyncState::Synced);
}

#[test]
fn unreadable_document_is_a_sync_error_and_keeps_tasks() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    let before = store.tasks().to_vec();

    service.put_document(&path_of(store.plan_id()), json!({ "tasks": "not a list" }));
    settle(&service, &mut store);

    assert!(matches!(store.status(), Some(StoreError::GenericSync(_))));
    assert_eq!(store.tasks(), before.as_slice());
}

#[test]
fn document_without_tasks_field_is_ignored() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    let before = store.tasks().to_vec();

    service.put_document(&path_of(store.plan_id()), json!({ "lastUpdated": 5 }));
    settle(&service, &mut store);

    assert_eq!(store.tasks(), before.as_slice());
    assert!(store.status().is_none());
}

#[test]
fn blank_custom_token_fails_auth_and_never_subscribes() {
    let service = MemoryDocumentService::new();
    let mut store = ScheduleStore::new(&config(), service.clone());
    store.activate(config().plan_id());

    let provider = LocalIdentityProvider::new("local-operator");
    let err = store.authenticate(&provider, Some("   ")).unwrap_err();
    settle(&service, &mut store);

    assert!(matches!(err, StoreError::AuthFailure(_)));
    assert_eq!(store.status(), Some(&err));
    assert_eq!(store.state(), SyncState::Unsubscribed);
    assert_eq!(service.subscriber_count(), 0);
    assert!(service.writes().is_empty());
}

#[test]
fn anonymous_identity_scopes_documents_by_configured_id() {
    let service = MemoryDocumentService::new();
    let mut store = ScheduleStore::new(&config(), service.clone());
    store.activate(config().plan_id());
    store
        .authenticate(&LocalIdentityProvider::new("local-operator"), None)
        .unwrap();
    settle(&service, &mut store);

    let path = DocumentPath::for_plan(&config().app_id, "local-operator", store.plan_id());
    assert_eq!(service.writes_to(&path), 1);
    assert!(store.identity().unwrap().is_anonymous());
}

#[test]
fn observers_see_local_and_remote_changes() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, Vec::new());
    let seen: Rc<RefCell<Vec<StoreChange>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store.add_observer(move |change| sink.borrow_mut().push(change.clone()));

    store
        .add_task(
            TaskDraft {
                resource: "Team A".to_string(),
                ..TaskDraft::default()
            },
            "",
        )
        .unwrap();
    settle(&service, &mut store);

    let seen = seen.borrow();
    assert_eq!(
        seen.first(),
        Some(&StoreChange::TasksChanged {
            origin: ChangeOrigin::Local,
            count: 1
        })
    );
    assert!(seen.contains(&StoreChange::TasksChanged {
        origin: ChangeOrigin::Remote,
        count: 1
    }));
}

#[test]
fn teardown_stops_listening_but_keeps_tasks() {
    let service = MemoryDocumentService::new();
    let mut store = synced_store(&service, default_schedule());
    store.teardown();
    settle(&service, &mut store);

    assert_eq!(store.state(), SyncState::Unsubscribed);
    assert_eq!(service.subscriber_count(), 0);
    assert_eq!(store.tasks().len(), 8);

    service.put_document(&path_of(store.plan_id()), document_with(&[]));
    settle(&service, &mut store);
    assert_eq!(store.tasks().len(), 8);
}
