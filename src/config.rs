use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use chrono_tz::Tz;

use crate::error::ConfigError;
use crate::tasks::reminder_loop::ReminderSettings;

pub const DEFAULT_EVENTS_FILE: &str = "events.json";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_REMINDER_HORIZON_MINUTES: i64 = 60;

/// `KEY=VALUE` settings read from an optional file. Lookups fall back to
/// the process environment.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub events_file: PathBuf,
    pub bind_address: SocketAddr,
    pub timezone: Tz,
    pub reminder: ReminderSettings,
}

impl Settings {
    pub fn resolve(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| config.get(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let events_file = lookup("EVENTS_FILE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENTS_FILE.to_string());
        let bind_address = parse_or("BIND_ADDRESS", &lookup, DEFAULT_BIND_ADDRESS.parse().ok())?;
        let timezone = parse_or("EVENT_TIMEZONE", &lookup, Some(Tz::UTC))?;
        let interval_secs: u64 = parse_or(
            "REMINDER_INTERVAL_SECS",
            &lookup,
            Some(DEFAULT_REMINDER_INTERVAL_SECS),
        )?;
        let horizon_minutes: i64 = parse_or(
            "REMINDER_HORIZON_MINUTES",
            &lookup,
            Some(DEFAULT_REMINDER_HORIZON_MINUTES),
        )?;

        if interval_secs == 0 {
            return Err(invalid("REMINDER_INTERVAL_SECS", "0"));
        }
        let horizon = Duration::try_minutes(horizon_minutes)
            .filter(|horizon| *horizon >= Duration::zero())
            .ok_or_else(|| invalid("REMINDER_HORIZON_MINUTES", &horizon_minutes.to_string()))?;

        Ok(Self {
            events_file: PathBuf::from(events_file),
            bind_address,
            timezone,
            reminder: ReminderSettings {
                interval: std::time::Duration::from_secs(interval_secs),
                horizon,
            },
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
        None => default.ok_or_else(|| invalid(key, "")),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
