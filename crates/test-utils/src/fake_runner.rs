use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagflow::errors::TaskError;
use dagflow::exec::{RunFuture, TaskOutput, TaskRunner};
use dagflow::model::Task;
use dagflow::types::TaskStatus;
use tokio_util::sync::CancellationToken;

/// One observable step of a fake run, keyed by task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Started(String),
    Finished(String),
}

/// A fake runner that:
/// - records start/finish of every task, in global order
/// - optionally sleeps per task (cancellable)
/// - fails the tasks it was told to fail
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    events: Arc<Mutex<Vec<RunEvent>>>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `delay` before finishing task `id`.
    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Fail task `id` with an unexpected-status error.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Ids in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::Started(id) => Some(id),
                RunEvent::Finished(_) => None,
            })
            .collect()
    }

    /// How many times task `id` was started.
    pub fn runs_of(&self, id: &str) -> usize {
        self.started().iter().filter(|s| s.as_str() == id).count()
    }

    /// Index of the first `Started(id)` event.
    pub fn start_index(&self, id: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| *e == RunEvent::Started(id.to_string()))
    }

    /// Index of the first `Finished(id)` event.
    pub fn finish_index(&self, id: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| *e == RunEvent::Finished(id.to_string()))
    }

    fn push(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl TaskRunner for RecordingRunner {
    fn run<'a>(&'a self, task: &'a Task, cancel: &'a CancellationToken) -> RunFuture<'a> {
        Box::pin(async move {
            let id = task.id().to_string();
            task.set_status(TaskStatus::Running);
            self.push(RunEvent::Started(id.clone()));

            if let Some(delay) = self.delays.get(&id) {
                tokio::select! {
                    _ = tokio::time::sleep(*delay) => {}
                    _ = cancel.cancelled() => {
                        task.set_status(TaskStatus::Failed);
                        return Err(TaskError::Cancelled);
                    }
                }
            }

            if self.failing.contains(&id) {
                task.set_status(TaskStatus::Failed);
                return Err(TaskError::UnexpectedStatus {
                    expected: 200,
                    actual: 500,
                });
            }

            task.set_status(TaskStatus::Completed);
            self.push(RunEvent::Finished(id.clone()));
            Ok(TaskOutput::String(id))
        })
    }
}
