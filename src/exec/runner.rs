// src/exec/runner.rs

//! Single-task runner.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::model::{LogPayload, Payload, Task};
use crate::types::{TaskKind, TaskStatus};

/// Value produced by a successful task.
pub type TaskOutput = serde_json::Value;

/// Boxed future returned by [`TaskRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskOutput, TaskError>> + Send + 'a>>;

/// Trait abstracting how one task is executed.
///
/// Production code uses [`PayloadRunner`]; tests can provide their own
/// implementation that records calls or injects failures.
///
/// Implementations own the task's status transitions: `Running` on entry,
/// then `Completed` or `Failed`. A runner never retries on its own; see
/// [`RetryingRunner`](crate::exec::RetryingRunner) for that.
pub trait TaskRunner: Send + Sync {
    fn run<'a>(&'a self, task: &'a Task, cancel: &'a CancellationToken) -> RunFuture<'a>;
}

impl<R: TaskRunner + ?Sized> TaskRunner for Arc<R> {
    fn run<'a>(&'a self, task: &'a Task, cancel: &'a CancellationToken) -> RunFuture<'a> {
        (**self).run(task, cancel)
    }
}

/// Runner that dispatches on the task's declared kind and payload variant.
#[derive(Debug, Clone, Default)]
pub struct PayloadRunner {
    log_delay: Duration,
}

impl PayloadRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait applied before a log task emits its message.
    pub fn with_log_delay(mut self, delay: Duration) -> Self {
        self.log_delay = delay;
        self
    }

    async fn dispatch(
        &self,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        match (task.kind(), task.payload()) {
            (TaskKind::Log, Payload::Log(payload)) => self.run_log(task, payload, cancel).await,
            (TaskKind::Http, Payload::Http(payload)) => {
                crate::exec::http::send(payload, cancel).await
            }
            (TaskKind::Unspecified, _) => Err(TaskError::UnknownType(task.kind())),
            (declared, payload) => Err(TaskError::PayloadMismatch {
                declared,
                payload: payload.kind(),
            }),
        }
    }

    async fn run_log(
        &self,
        task: &Task,
        payload: &LogPayload,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        if !self.log_delay.is_zero() {
            debug!(task = %task.id(), delay = ?self.log_delay, "delaying log task");
            tokio::select! {
                _ = tokio::time::sleep(self.log_delay) => {}
                _ = cancel.cancelled() => return Err(TaskError::Cancelled),
            }
        }

        info!(task = %task.id(), name = %task.name(), message = %payload.message(), "log task emitted");
        Ok(TaskOutput::String(payload.message().to_string()))
    }
}

impl TaskRunner for PayloadRunner {
    fn run<'a>(&'a self, task: &'a Task, cancel: &'a CancellationToken) -> RunFuture<'a> {
        Box::pin(async move {
            task.set_status(TaskStatus::Running);
            info!(task = %task.id(), name = %task.name(), kind = %task.kind(), "task_started");

            match self.dispatch(task, cancel).await {
                Ok(output) => {
                    task.set_status(TaskStatus::Completed);
                    Ok(output)
                }
                Err(err) => {
                    task.set_status(TaskStatus::Failed);
                    warn!(task = %task.id(), name = %task.name(), error = %err, "task_failed");
                    Err(err)
                }
            }
        })
    }
}
