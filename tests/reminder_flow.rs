use std::env;
use std::fs;

use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Tz;
use event_scheduler::service::{CreateEventRequest, EventService, UpdateEventRequest};
use event_scheduler::store::{EventStore, JsonFileBackend};
use event_scheduler::tasks::reminder_loop::{
    PollerState, ReminderNotifier, ReminderPoller, ReminderSettings,
};
use tokio::sync::Mutex as TokioMutex;

struct MockNotifier {
    sent: TokioMutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ReminderNotifier for MockNotifier {
    async fn notify(&self, line: &str) -> Result<(), String> {
        self.sent.lock().await.push(line.to_string());
        Ok(())
    }
}

fn request(title: &str, start: &str, end: &str) -> CreateEventRequest {
    CreateEventRequest {
        title: Some(title.to_string()),
        description: Some("reminder test".to_string()),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        recurring: None,
    }
}

#[tokio::test]
async fn poller_sees_changes_made_through_the_service() {
    let temp_dir = env::temp_dir().join(format!("event_scheduler_it_{}", uuid::Uuid::new_v4()));
    let store = EventStore::open(JsonFileBackend::new(temp_dir.join("events.json")), Tz::UTC).into_shared();
    let service = EventService::new(store.clone());
    let mut poller = ReminderPoller::new(
        store,
        MockNotifier {
            sent: TokioMutex::new(Vec::new()),
        },
        ReminderSettings::default(),
    );

    let now = Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
    service
        .create(request("Standup", "2026-02-02T12:45:00", "2026-02-02T13:00:00"))
        .await
        .expect("create should succeed");
    service
        .create(request("Retro", "2026-02-02T15:00:00", "2026-02-02T16:00:00"))
        .await
        .expect("create should succeed");

    assert_eq!(poller.check(now).await, 1);

    service
        .update(
            2,
            UpdateEventRequest {
                start_time: Some("2026-02-02T12:10:00".to_string()),
                ..UpdateEventRequest::default()
            },
        )
        .await
        .expect("update should succeed");
    assert_eq!(poller.check(now + Duration::minutes(1)).await, 2);

    service.delete(1).await.expect("delete should succeed");
    assert_eq!(poller.check(now + Duration::minutes(2)).await, 1);
    assert_eq!(poller.state(), PollerState::Idle);

    let sent = poller.notifier().sent.lock().await;
    assert_eq!(
        *sent,
        vec![
            "REMINDER: Standup starts at 12:45".to_string(),
            "REMINDER: Standup starts at 12:45".to_string(),
            "REMINDER: Retro starts at 12:10".to_string(),
            "REMINDER: Retro starts at 12:10".to_string(),
        ]
    );
    drop(sent);

    let reopened = EventStore::open(JsonFileBackend::new(temp_dir.join("events.json")), Tz::UTC);
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get(2).unwrap().start_time, "2026-02-02T12:10:00");
    let _ = fs::remove_dir_all(&temp_dir);
}

#[tokio::test]
async fn reminders_render_in_configured_zone() {
    let temp_dir = env::temp_dir().join(format!("event_scheduler_it_{}", uuid::Uuid::new_v4()));
    let zone: Tz = "Europe/Berlin".parse().unwrap();
    let store = EventStore::open(JsonFileBackend::new(temp_dir.join("events.json")), zone).into_shared();
    let service = EventService::new(store.clone());
    let mut poller = ReminderPoller::new(
        store,
        MockNotifier {
            sent: TokioMutex::new(Vec::new()),
        },
        ReminderSettings::default(),
    );

    // Naive input is Berlin wall-clock time; 13:30 CET is 12:30 UTC.
    service
        .create(request("Lunch", "2026-02-02T13:30:00", "2026-02-02T14:30:00"))
        .await
        .unwrap();
    let now = Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
    assert_eq!(poller.check(now).await, 1);
    assert_eq!(
        poller.notifier().sent.lock().await[0],
        "REMINDER: Lunch starts at 13:30"
    );
    let _ = fs::remove_dir_all(&temp_dir);
}
