use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::EventBackend;
use crate::error::StoreResult;
use crate::models::{Event, EventId, EventPatch, NewEvent};

/// Handle shared by the HTTP handlers, the CLI and the reminder loop.
/// Every read and write of the event set goes through this lock.
pub type SharedStore = Arc<Mutex<EventStore>>;

/// Authoritative in-memory event set, written through to its backend after
/// every mutation. A failed save rolls the mutation back, so memory always
/// matches the last successful write.
pub struct EventStore {
    events: Vec<Event>,
    backend: Box<dyn EventBackend>,
    zone: Tz,
}

impl EventStore {
    /// Opens the store and loads whatever the backend holds. Unreadable or
    /// malformed state starts an empty set instead of failing.
    pub fn open<B: EventBackend + 'static>(backend: B, zone: Tz) -> Self {
        let mut store = Self {
            events: Vec::new(),
            backend: Box::new(backend),
            zone,
        };
        store.load();
        store
    }

    fn load(&mut self) {
        self.events = match self.backend.load() {
            Ok(events) => events,
            Err(err) => {
                warn!("Failed to load events, starting empty: {}", err);
                Vec::new()
            }
        };
        info!("Loaded {} events", self.events.len());
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // max + 1 hands the highest id out again once that event is deleted.
    fn next_id(&self) -> EventId {
        self.events.iter().map(|event| event.id).max().unwrap_or(0) + 1
    }

    pub fn add(&mut self, new_event: NewEvent) -> StoreResult<Event> {
        let event = Event {
            id: self.next_id(),
            title: new_event.title,
            description: new_event.description,
            start_time: new_event.start_time,
            end_time: new_event.end_time,
            recurring: new_event.recurring,
            created_at: Utc::now(),
        };
        self.events.push(event.clone());
        if let Err(err) = self.persist() {
            self.events.pop();
            return Err(err);
        }
        info!(id = event.id, title = %event.title, "Event created");
        Ok(event)
    }

    /// All events by start time. Unparsable starts go last; ties keep
    /// insertion order.
    pub fn list(&self) -> Vec<Event> {
        let mut sorted = self.events.clone();
        sorted.sort_by_cached_key(|event| {
            let start = event.starts_at(self.zone);
            (start.is_none(), start)
        });
        sorted
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn update(&mut self, id: EventId, patch: EventPatch) -> StoreResult<Option<Event>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let previous = self.events[index].clone();
        self.events[index].apply(patch);
        if let Err(err) = self.persist() {
            self.events[index] = previous;
            return Err(err);
        }
        info!(id, "Event updated");
        Ok(Some(self.events[index].clone()))
    }

    pub fn delete(&mut self, id: EventId) -> StoreResult<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let removed = self.events.remove(index);
        if let Err(err) = self.persist() {
            self.events.insert(index, removed);
            return Err(err);
        }
        info!(id, "Event deleted");
        Ok(true)
    }

    /// Case-insensitive substring match on title or description, in store order.
    pub fn search(&self, query: &str) -> Vec<Event> {
        let needle = query.to_lowercase();
        let results: Vec<Event> = self
            .events
            .iter()
            .filter(|event| event.matches(&needle))
            .cloned()
            .collect();
        debug!(query, matches = results.len(), "Searched events");
        results
    }

    /// Events with `0 <= start - now <= horizon`. Events whose start time
    /// cannot be parsed are skipped.
    pub fn upcoming_within(&self, horizon: Duration, now: DateTime<Utc>) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| {
                let Some(start) = event.starts_at(self.zone) else {
                    debug!(id = event.id, "Skipping event with unparsable start time");
                    return false;
                };
                let until_start = start - now;
                until_start >= Duration::zero() && until_start <= horizon
            })
            .cloned()
            .collect()
    }

    fn position(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|event| event.id == id)
    }

    fn persist(&mut self) -> StoreResult<()> {
        self.backend.save(&self.events).inspect_err(|err| {
            warn!("Failed to save events: {}", err);
        })
    }
}
