use anyhow::Result;
use tracing::info;

use crate::config::Settings;
use crate::handlers::api;
use crate::service::EventService;
use crate::store::{EventStore, JsonFileBackend, SharedStore};
use crate::tasks::reminder_loop::{LogNotifier, ReminderPoller};
use crate::tasks::task_runner::TaskRunner;

pub fn open_store(settings: &Settings) -> SharedStore {
    let backend = JsonFileBackend::new(&settings.events_file);
    EventStore::open(backend, settings.timezone).into_shared()
}

/// Serves the REST API with the reminder loop running beside it until
/// Ctrl-C, then stops the loop before returning.
pub async fn run_api(shared_store: SharedStore, settings: Settings) -> Result<()> {
    let mut task_runner = TaskRunner::new();
    task_runner.add_task("reminder_loop", {
        let store = shared_store.clone();
        let reminder = settings.reminder;
        move |shutdown| {
            tokio::spawn(async move {
                ReminderPoller::new(store, LogNotifier, reminder)
                    .run(shutdown)
                    .await;
            })
        }
    });
    let running = task_runner.start_all();

    let routes = api::routes(EventService::new(shared_store));
    info!(
        address = %settings.bind_address,
        events_file = %settings.events_file.display(),
        "Event scheduler listening"
    );
    tokio::select! {
        _ = warp::serve(routes).run(settings.bind_address) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
        }
    }

    running.shutdown().await;
    info!("Event scheduler stopped");
    Ok(())
}
