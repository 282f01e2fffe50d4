use chrono::NaiveDate;
use dairyops_core::interchange::csv::parse_import;
use dairyops_core::model::task::{default_schedule, Task};
use dairyops_core::sync::error::StoreError;
use dairyops_core::sync::identity::UserIdentity;
use dairyops_core::sync::memory::MemoryDocumentService;
use dairyops_core::sync::store::ScheduleStore;
use dairyops_core::PlannerConfig;
use std::collections::HashSet;

fn tuple(task: &Task) -> (String, String, String, String) {
    (
        task.resource.clone(),
        task.label.clone(),
        task.start.clone(),
        task.end.clone(),
    )
}

fn synced(service: &MemoryDocumentService, tasks: Vec<Task>) -> ScheduleStore<MemoryDocumentService> {
    let mut store = ScheduleStore::with_tasks(&PlannerConfig::default(), service.clone(), tasks);
    store.set_identity(UserIdentity::new("operator-1", false));
    store.activate(PlannerConfig::default().plan_id());
    while store.process_events() > 0 {}
    store
}

#[test]
fn exported_default_day_imports_back_in_order_with_fresh_ids() {
    let source = default_schedule();
    let service = MemoryDocumentService::new();
    let exporter = synced(&service, source.clone());
    let payload = exporter.export_csv(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

    assert_eq!(payload.file_name, "my-dairy-plan_2024-03-05.csv");
    assert_eq!(payload.media_type, "text/csv;charset=utf-8");

    let other_service = MemoryDocumentService::new();
    let mut importer = synced(&other_service, Vec::new());
    let pending = importer.parse_import(&payload.content).unwrap();
    assert_eq!(
        pending.confirmation_prompt(),
        "Successfully parsed 8 tasks. Replace current schedule?"
    );
    assert_eq!(importer.commit_import(pending), 8);
    while importer.process_events() > 0 {}

    let imported: Vec<_> = importer.tasks().iter().map(tuple).collect();
    let expected: Vec<_> = source.iter().map(tuple).collect();
    assert_eq!(imported, expected);

    let ids: HashSet<_> = importer.tasks().iter().map(|task| task.id.clone()).collect();
    assert_eq!(ids.len(), 8);
    assert!(source.iter().all(|task| !ids.contains(&task.id)));
}

#[test]
fn labels_with_commas_survive_the_round_trip() {
    let tasks = vec![
        Task::new("Team A", "Milking, parlor 1", "02:30", "05:30"),
        Task::new("Dr. Smith", "", "10:00", "12:00"),
    ];
    let service = MemoryDocumentService::new();
    let store = synced(&service, tasks);
    let payload = store.export_csv(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let pending = parse_import(&payload.content).unwrap();
    let labels: Vec<&str> = pending.tasks().iter().map(|task| task.label.as_str()).collect();
    // An empty label is written as "" and read back as the placeholder.
    assert_eq!(labels, vec!["Milking, parlor 1", "Unnamed Task"]);
}

#[test]
fn import_without_valid_rows_leaves_schedule_untouched() {
    let service = MemoryDocumentService::new();
    let mut store = synced(&service, default_schedule());
    let before = store.tasks().to_vec();
    let writes_before = service.writes().len();

    let err = store
        .parse_import("Resource,Task,Start Time,End Time\ngarbage\nstill,garbage\n")
        .unwrap_err();
    while store.process_events() > 0 {}

    assert!(matches!(err, StoreError::ImportParseFailure(_)));
    assert_eq!(
        err.user_message(),
        "Could not parse CSV. Ensure format is: Resource,Task,Start,End"
    );
    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(service.writes().len(), writes_before);
    assert!(store.status().is_none());
}

#[test]
fn partially_valid_import_replaces_with_parsed_rows_only() {
    let service = MemoryDocumentService::new();
    let mut store = synced(&service, default_schedule());

    let pending = store
        .parse_import(
            "Resource,Task,Start Time,End Time\r\n\
             Team A,\"Morning Milking\",02:30,05:30\r\n\
             \r\n\
             broken line\r\n\
             Tanker 1,Milk Collection,05:00,06:30\r\n",
        )
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending.dropped_lines(), 1);

    store.commit_import(pending);
    while store.process_events() > 0 {}

    let resources: Vec<&str> = store.tasks().iter().map(|task| task.resource.as_str()).collect();
    assert_eq!(resources, vec!["Team A", "Tanker 1"]);
    assert_eq!(store.tasks()[1].label, "Milk Collection");
}
