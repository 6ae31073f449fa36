use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type TaskStarter = Box<dyn FnOnce(CancellationToken) -> JoinHandle<()> + Send>;

/// Collects background tasks and starts them together. Each task gets a
/// child of the runner's shutdown token.
pub struct TaskRunner {
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, TaskStarter)>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(CancellationToken) -> JoinHandle<()> + Send + 'static,
    {
        self.tasks.push((name, Box::new(task)));
    }

    pub fn start_all(self) -> RunningTasks {
        let handles = self
            .tasks
            .into_iter()
            .map(|(name, task)| {
                info!(task = name, "Starting background task");
                (name, task(self.shutdown.child_token()))
            })
            .collect();
        RunningTasks {
            shutdown: self.shutdown,
            handles,
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RunningTasks {
    shutdown: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningTasks {
    /// Cancels every task and waits for each to return.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, handle) in self.handles {
            if let Err(err) = handle.await {
                warn!(task = name, "Background task ended abnormally: {}", err);
            }
        }
    }
}
