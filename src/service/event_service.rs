use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::models::timestamp::parse_timestamp;
use crate::models::{Event, EventId, EventPatch, NewEvent, Recurrence};
use crate::store::SharedStore;

pub const DEFAULT_UPCOMING_HOURS: i64 = 1;

/// Body of a create call. Every field is optional here so that a missing
/// one can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub recurring: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub recurring: Option<String>,
}

/// Validating front of the event store. Everything that reaches the store
/// through here already satisfies the event invariants.
#[derive(Clone)]
pub struct EventService {
    store: SharedStore,
}

impl EventService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateEventRequest) -> ServiceResult<Event> {
        let mut store = self.store.lock().await;
        let zone = store.zone();

        let title = required("title", request.title)?;
        let description = required("description", request.description)?;
        let start_time = required("start_time", request.start_time)?;
        let end_time = required("end_time", request.end_time)?;
        let (Some(start), Some(end)) = (
            parse_timestamp(&start_time, zone),
            parse_timestamp(&end_time, zone),
        ) else {
            return Err(ServiceError::validation("Invalid datetime format"));
        };
        ensure_ordered(start, end)?;
        let recurring = parse_recurrence(request.recurring.as_deref())?;

        let event = store.add(NewEvent {
            title,
            description,
            start_time,
            end_time,
            recurring,
        })?;
        Ok(event)
    }

    pub async fn list(&self) -> Vec<Event> {
        self.store.lock().await.list()
    }

    pub async fn get(&self, id: EventId) -> ServiceResult<Event> {
        let store = self.store.lock().await;
        store.get(id).cloned().ok_or(ServiceError::NotFound(id))
    }

    /// Applies the supplied fields. When only one side of the schedule
    /// changes, the stored value of the other side is used for the
    /// `end > start` check.
    pub async fn update(&self, id: EventId, request: UpdateEventRequest) -> ServiceResult<Event> {
        let mut store = self.store.lock().await;
        let zone = store.zone();

        let patch = EventPatch {
            title: non_empty("title", request.title)?,
            description: non_empty("description", request.description)?,
            start_time: timestamp_field("start_time", request.start_time, zone)?,
            end_time: timestamp_field("end_time", request.end_time, zone)?,
            recurring: request
                .recurring
                .as_deref()
                .map(|tag| parse_recurrence(Some(tag)))
                .transpose()?,
        };

        let existing = store.get(id).ok_or(ServiceError::NotFound(id))?;
        if patch.touches_schedule() {
            let start = patch.start_time.as_deref().unwrap_or(&existing.start_time);
            let end = patch.end_time.as_deref().unwrap_or(&existing.end_time);
            if let (Some(start), Some(end)) = (parse_timestamp(start, zone), parse_timestamp(end, zone)) {
                ensure_ordered(start, end)?;
            }
        }

        store
            .update(id, patch)?
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn delete(&self, id: EventId) -> ServiceResult<()> {
        let mut store = self.store.lock().await;
        if store.delete(id)? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(id))
        }
    }

    pub async fn search(&self, query: &str) -> ServiceResult<Vec<Event>> {
        if query.trim().is_empty() {
            return Err(ServiceError::validation("Search query is required"));
        }
        Ok(self.store.lock().await.search(query))
    }

    pub async fn upcoming(&self, hours: Option<i64>) -> ServiceResult<Vec<Event>> {
        self.upcoming_at(hours, Utc::now()).await
    }

    pub async fn upcoming_at(&self, hours: Option<i64>, now: DateTime<Utc>) -> ServiceResult<Vec<Event>> {
        let hours = hours.unwrap_or(DEFAULT_UPCOMING_HOURS);
        // A negative horizon is an empty window.
        if hours < 0 {
            return Ok(Vec::new());
        }
        let horizon = Duration::try_hours(hours)
            .ok_or_else(|| ServiceError::validation("hours is out of range"))?;
        let events = self.store.lock().await.upcoming_within(horizon, now);
        debug!(hours, count = events.len(), "Queried upcoming events");
        Ok(events)
    }
}

fn required(field: &str, value: Option<String>) -> ServiceResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(ServiceError::validation(format!("Field must not be empty: {}", field))),
        None => Err(ServiceError::validation(format!("Missing required field: {}", field))),
    }
}

fn non_empty(field: &str, value: Option<String>) -> ServiceResult<Option<String>> {
    value.map(|value| required(field, Some(value))).transpose()
}

fn timestamp_field(field: &str, value: Option<String>, zone: Tz) -> ServiceResult<Option<String>> {
    match value {
        Some(text) if parse_timestamp(&text, zone).is_some() => Ok(Some(text)),
        Some(_) => Err(ServiceError::validation(format!("Invalid {} format", field))),
        None => Ok(None),
    }
}

fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> ServiceResult<()> {
    if end <= start {
        return Err(ServiceError::validation("End time must be after start time"));
    }
    Ok(())
}

fn parse_recurrence(value: Option<&str>) -> ServiceResult<Recurrence> {
    match value {
        Some(tag) => tag.parse().map_err(ServiceError::Validation),
        None => Ok(Recurrence::None),
    }
}
