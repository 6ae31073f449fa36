use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::timestamp::parse_timestamp;

pub type EventId = u64;

/// Recurrence tag. Stored and returned, never expanded into occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Recurrence::None => None,
            Recurrence::Daily => Some("daily"),
            Recurrence::Weekly => Some("weekly"),
            Recurrence::Monthly => Some("monthly"),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().unwrap_or("none"))
    }
}

impl FromStr for Recurrence {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(format!(
                "Invalid recurring value: {} (expected daily, weekly, monthly or none)",
                other
            )),
        }
    }
}

// On the wire `None` is JSON null, the rest are lowercase strings.
impl Serialize for Recurrence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(tag) => serializer.serialize_str(tag),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Recurrence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(tag) => tag.parse().map_err(serde::de::Error::custom),
            None => Ok(Recurrence::None),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub recurring: Recurrence,
    #[serde(deserialize_with = "created_at_lenient")]
    pub created_at: DateTime<Utc>,
}

// Files written by older versions carry `created_at` without an offset; those
// are read as UTC.
fn created_at_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw, Tz::UTC)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid created_at: {}", raw)))
}

impl Event {
    pub fn starts_at(&self, zone: Tz) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.start_time, zone)
    }

    pub fn ends_at(&self, zone: Tz) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.end_time, zone)
    }

    pub fn matches(&self, needle_lowercase: &str) -> bool {
        self.title.to_lowercase().contains(needle_lowercase)
            || self.description.to_lowercase().contains(needle_lowercase)
    }

    pub(crate) fn apply(&mut self, patch: EventPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(recurring) = patch.recurring {
            self.recurring = recurring;
        }
    }
}

/// Already-validated input for a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub recurring: Recurrence,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub recurring: Option<Recurrence>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == EventPatch::default()
    }

    pub fn touches_schedule(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}
