// src/exec/retry.rs

//! Retry policy layer.
//!
//! Wraps any [`TaskRunner`] and re-invokes it up to `task.retries()` extra
//! times, waiting `task.retry_delay()` between attempts. Permanent errors
//! (payload mismatch, unknown type, cancellation) are returned at once.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::TaskError;
use crate::exec::runner::{RunFuture, TaskRunner};
use crate::model::Task;

#[derive(Debug, Clone, Default)]
pub struct RetryingRunner<R> {
    inner: R,
}

impl<R: TaskRunner> RetryingRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: TaskRunner> TaskRunner for RetryingRunner<R> {
    fn run<'a>(&'a self, task: &'a Task, cancel: &'a CancellationToken) -> RunFuture<'a> {
        Box::pin(async move {
            let attempts = u32::from(task.retries()) + 1;
            let mut attempt = 1;

            loop {
                let err = match self.inner.run(task, cancel).await {
                    Ok(output) => return Ok(output),
                    Err(err) => err,
                };

                if err.is_permanent() || attempt >= attempts {
                    if attempt > 1 {
                        warn!(task = %task.id(), attempt, error = %err, "giving up on task");
                    }
                    return Err(err);
                }

                warn!(
                    task = %task.id(),
                    attempt,
                    attempts,
                    error = %err,
                    "task attempt failed; retrying"
                );

                let delay = task.retry_delay();
                if !delay.is_zero() {
                    debug!(task = %task.id(), delay = ?delay, "waiting before retry");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(TaskError::Cancelled),
                    }
                } else if cancel.is_cancelled() {
                    return Err(TaskError::Cancelled);
                }

                attempt += 1;
            }
        })
    }
}
