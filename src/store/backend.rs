use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::Event;

/// Durable home of the event set. The store hands over the complete set
/// on every save.
pub trait EventBackend: Send {
    fn load(&self) -> StoreResult<Vec<Event>>;
    fn save(&mut self, events: &[Event]) -> StoreResult<()>;
}

/// Events kept as a pretty-printed JSON array in one file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "events.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
    }
}

impl EventBackend for JsonFileBackend {
    fn load(&self) -> StoreResult<Vec<Event>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, events: &[Event]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(events)?;
        // Write beside the target and rename so readers never see a half-written file.
        let temp = self.temp_path();
        fs::write(&temp, body)?;
        if let Err(err) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::Io(err));
        }
        Ok(())
    }
}

/// In-process backend. Clones share the saved snapshot, so a test can keep
/// one handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    saved: Arc<Mutex<Vec<Event>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        let backend = Self::default();
        *backend.lock() = events;
        backend
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventBackend for MemoryBackend {
    fn load(&self) -> StoreResult<Vec<Event>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, events: &[Event]) -> StoreResult<()> {
        *self.lock() = events.to_vec();
        Ok(())
    }
}
