use std::env;
use std::fs;
use std::path::PathBuf;

use chrono_tz::Tz;
use event_scheduler::models::{EventPatch, NewEvent, Recurrence};
use event_scheduler::store::{EventBackend, EventStore, JsonFileBackend};

fn temp_events_file() -> PathBuf {
    env::temp_dir()
        .join(format!("event_scheduler_it_{}", uuid::Uuid::new_v4()))
        .join("events.json")
}

fn meeting(title: &str, start: &str, end: &str, recurring: Recurrence) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        description: format!("{} notes", title),
        start_time: start.to_string(),
        end_time: end.to_string(),
        recurring,
    }
}

#[test]
fn save_then_load_empty_store_yields_empty_set() {
    let path = temp_events_file();
    let mut backend = JsonFileBackend::new(&path);
    backend.save(&[]).expect("save should succeed");

    let store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    assert!(store.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn reopened_store_has_identical_events() {
    let path = temp_events_file();
    let mut store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    store
        .add(meeting("Planning", "2024-01-15T14:00:00", "2024-01-15T15:00:00", Recurrence::Weekly))
        .unwrap();
    store
        .add(meeting("Review", "2024-01-15T10:00:00", "2024-01-15T11:00:00", Recurrence::None))
        .unwrap();
    store
        .update(1, EventPatch {
            description: Some("moved to room 4".to_string()),
            ..EventPatch::default()
        })
        .unwrap();

    let reopened = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    assert_eq!(reopened.list(), store.list());
    assert_eq!(reopened.get(1).unwrap().description, "moved to room 4");
    assert_eq!(reopened.get(1).unwrap().recurring, Recurrence::Weekly);
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn persisted_layout_matches_boundary_contract() {
    let path = temp_events_file();
    let mut store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    store
        .add(meeting("Planning", "2024-01-15T14:00:00", "2024-01-15T15:00:00", Recurrence::None))
        .unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let record = &raw.as_array().expect("events are stored as an array")[0];
    assert_eq!(record["id"], 1);
    assert_eq!(record["title"], "Planning");
    assert_eq!(record["start_time"], "2024-01-15T14:00:00");
    assert!(record["recurring"].is_null());
    assert!(record["created_at"].is_string());
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn malformed_file_starts_empty_and_next_save_repairs_it() {
    let path = temp_events_file();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "[{\"id\": 1, \"title\": ").unwrap();

    let mut store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    assert!(store.is_empty());

    let event = store
        .add(meeting("Fresh", "2024-01-15T10:00:00", "2024-01-15T11:00:00", Recurrence::None))
        .unwrap();
    assert_eq!(event.id, 1);
    let reopened = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    assert_eq!(reopened.len(), 1);
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn ids_continue_from_persisted_maximum() {
    let path = temp_events_file();
    {
        let mut store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
        for n in 0..3 {
            store
                .add(meeting(&format!("e{}", n), "2024-01-15T10:00:00", "2024-01-15T11:00:00", Recurrence::None))
                .unwrap();
        }
        assert!(store.delete(1).unwrap());
    }

    let mut store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    let next = store
        .add(meeting("e3", "2024-01-15T10:00:00", "2024-01-15T11:00:00", Recurrence::None))
        .unwrap();
    assert_eq!(next.id, 4);
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_with_offsetless_created_at_loads_and_survives_next_add() {
    let path = temp_events_file();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"[
  {
    "id": 1,
    "title": "Team Meeting",
    "description": "Weekly sync",
    "start_time": "2024-01-15T10:00:00",
    "end_time": "2024-01-15T11:00:00",
    "recurring": "weekly",
    "created_at": "2024-01-10T09:12:33.123456"
  },
  {
    "id": 2,
    "title": "Dentist",
    "description": "Checkup",
    "start_time": "2024-01-16T14:00:00",
    "end_time": "2024-01-16T15:00:00",
    "recurring": null,
    "created_at": "2024-01-11T17:40:02.000001"
  }
]"#,
    )
    .unwrap();

    let mut store = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(1).unwrap().recurring, Recurrence::Weekly);

    let added = store
        .add(meeting("New", "2024-01-17T10:00:00", "2024-01-17T11:00:00", Recurrence::None))
        .unwrap();
    assert_eq!(added.id, 3);

    let reopened = EventStore::open(JsonFileBackend::new(&path), Tz::UTC);
    let titles: Vec<String> = reopened.list().into_iter().map(|event| event.title).collect();
    assert_eq!(titles, vec!["Team Meeting", "Dentist", "New"]);
    let _ = fs::remove_dir_all(path.parent().unwrap());
}
