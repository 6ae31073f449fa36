use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::Event;
use crate::models::timestamp::format_clock;
use crate::store::{EventStore, SharedStore};

#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn notify(&self, line: &str) -> Result<(), String>;
}

/// Writes reminders to the application log.
pub struct LogNotifier;

#[async_trait]
impl ReminderNotifier for LogNotifier {
    async fn notify(&self, line: &str) -> Result<(), String> {
        info!(target: "event_scheduler::reminder", "{}", line);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReminderSettings {
    pub interval: std::time::Duration,
    pub horizon: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(60),
            horizon: Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Checking,
}

/// `REMINDER: <title> starts at <HH:MM>`, or `None` when the start time
/// does not parse.
pub fn reminder_line(event: &Event, zone: Tz) -> Option<String> {
    let start = event.starts_at(zone)?;
    Some(format!(
        "REMINDER: {} starts at {}",
        event.title,
        format_clock(&start, zone)
    ))
}

/// Lines for every event starting within `horizon` of `now`.
pub fn collect_reminders(store: &EventStore, horizon: Duration, now: DateTime<Utc>) -> Vec<String> {
    let zone = store.zone();
    store
        .upcoming_within(horizon, now)
        .iter()
        .filter_map(|event| reminder_line(event, zone))
        .collect()
}

/// Periodically reports events that start soon. Nothing is remembered
/// between checks, so an event is reported on every tick until it starts.
pub struct ReminderPoller<N: ReminderNotifier> {
    store: SharedStore,
    notifier: N,
    settings: ReminderSettings,
    state: PollerState,
}

impl<N: ReminderNotifier> ReminderPoller<N> {
    pub fn new(store: SharedStore, notifier: N, settings: ReminderSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
            state: PollerState::Idle,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// One idle -> checking -> idle cycle. Returns the number of reminders
    /// delivered.
    pub async fn check(&mut self, now: DateTime<Utc>) -> usize {
        self.state = PollerState::Checking;
        let lines = {
            let store = self.store.lock().await;
            collect_reminders(&store, self.settings.horizon, now)
        };

        let mut delivered = 0;
        for line in &lines {
            match self.notifier.notify(line).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!("Failed to deliver reminder: {}", err),
            }
        }
        debug!(upcoming = lines.len(), delivered, "Reminder check finished");
        self.state = PollerState::Idle;
        delivered
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            horizon_minutes = self.settings.horizon.num_minutes(),
            "Reminder loop started"
        );
        let mut ticker = interval_at(Instant::now() + self.settings.interval, self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check(Utc::now()).await;
                }
                _ = shutdown.cancelled() => {
                    info!("Reminder loop stopping");
                    break;
                }
            }
        }
    }
}
