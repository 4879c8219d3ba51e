// src/engine/mod.rs

//! Workflow execution engine.
//!
//! - [`executor`] holds [`DagExecutor`], the scheduler that launches root
//!   tasks, advances the frontier as fan-in gates open, detects cycles and
//!   aggregates the first failure.
//! - [`context`] holds the per-run state shared by concurrent branches.
//!
//! Progress leaves the engine through a [`ResultSink`]: one
//! [`ProgressRecord`] per completed task, then one summary record when the
//! run succeeds.

pub mod context;
pub mod executor;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::errors::SinkError;
use crate::exec::TaskOutput;
use crate::model::{Task, TaskId};
use crate::types::{TaskStatus, WorkflowStatus};

pub use executor::{DEFAULT_TIMEOUT, DagExecutor, ExecutorOptions};

/// One entry of the progress stream.
///
/// Task records carry the task's id, status and output; the final summary
/// leaves those empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub task_id: Option<TaskId>,
    pub status: Option<TaskStatus>,
    pub output: Option<TaskOutput>,
    pub workflow_status: WorkflowStatus,
    pub total_tasks: usize,
    pub executed_tasks: usize,
}

impl ProgressRecord {
    pub(crate) fn task(
        task: &Task,
        output: TaskOutput,
        workflow_status: WorkflowStatus,
        total_tasks: usize,
        executed_tasks: usize,
    ) -> Self {
        Self {
            task_id: Some(task.id().clone()),
            status: Some(task.status()),
            output: Some(output),
            workflow_status,
            total_tasks,
            executed_tasks,
        }
    }

    pub(crate) fn summary(
        workflow_status: WorkflowStatus,
        total_tasks: usize,
        executed_tasks: usize,
    ) -> Self {
        Self {
            task_id: None,
            status: None,
            output: None,
            workflow_status,
            total_tasks,
            executed_tasks,
        }
    }

    /// True for the final record of a successful run.
    pub fn is_summary(&self) -> bool {
        self.task_id.is_none()
    }
}

/// Counts reported by a successful execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub total_tasks: usize,
    pub executed_tasks: usize,
}

/// Boxed future returned by [`ResultSink::emit`].
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Consumer of the progress stream.
///
/// `emit` may apply backpressure; a sink that never resolves stalls the run.
pub trait ResultSink: Send + Sync {
    fn emit(&self, record: ProgressRecord) -> SinkFuture<'_>;
}

impl ResultSink for mpsc::Sender<ProgressRecord> {
    fn emit(&self, record: ProgressRecord) -> SinkFuture<'_> {
        Box::pin(async move { self.send(record).await.map_err(|_| SinkError::Closed) })
    }
}

impl ResultSink for mpsc::UnboundedSender<ProgressRecord> {
    fn emit(&self, record: ProgressRecord) -> SinkFuture<'_> {
        let res = self.send(record).map_err(|_| SinkError::Closed);
        Box::pin(async move { res })
    }
}
