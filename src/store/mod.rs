pub mod backend;
pub mod event_store;

pub use backend::{EventBackend, JsonFileBackend, MemoryBackend};
pub use event_store::{EventStore, SharedStore};
