pub mod event;
pub mod timestamp;

pub use event::{Event, EventId, EventPatch, NewEvent, Recurrence};
