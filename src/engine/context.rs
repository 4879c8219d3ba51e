// src/engine/context.rs

//! Per-run state shared by every branch of one execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::dag::PendingDeps;
use crate::engine::ResultSink;
use crate::errors::ExecError;
use crate::exec::TaskRunner;
use crate::model::{Task, TaskGraph, TaskId};
use crate::types::WorkflowStatus;

/// Everything a branch needs, behind one `Arc`.
///
/// The counters and the completed-set are the only state mutated
/// concurrently; both are updated with atomic operations, never a shared
/// lock.
pub struct RunContext {
    pub(crate) graph: Arc<TaskGraph>,
    pub(crate) pending: PendingDeps,
    pub(crate) completed: DashMap<TaskId, ()>,
    pub(crate) executed: AtomicUsize,
    pub(crate) total: usize,
    pub(crate) cancel: CancellationToken,
    pub(crate) deadline_hit: AtomicBool,
    pub(crate) runner: Arc<dyn TaskRunner>,
    pub(crate) sink: Arc<dyn ResultSink>,
    /// Workflow status reported in task records (always `Running`).
    pub(crate) workflow_status: WorkflowStatus,
}

impl RunContext {
    pub(crate) fn new(
        graph: Arc<TaskGraph>,
        pending: PendingDeps,
        cancel: CancellationToken,
        runner: Arc<dyn TaskRunner>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let total = pending.len();
        Self {
            graph,
            pending,
            completed: DashMap::with_capacity(total),
            executed: AtomicUsize::new(0),
            total,
            cancel,
            deadline_hit: AtomicBool::new(false),
            runner,
            sink,
            workflow_status: WorkflowStatus::Running,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::Acquire)
    }

    /// Record completion of `id`; returns false if it was already recorded.
    pub(crate) fn mark_completed(&self, id: &TaskId) -> bool {
        self.completed.insert(id.clone(), ()).is_none()
    }

    pub(crate) fn is_completed(&self, id: &TaskId) -> bool {
        self.completed.contains_key(id)
    }

    pub(crate) fn bump_executed(&self) -> usize {
        self.executed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Error describing why the shared token fired.
    pub(crate) fn cancellation_error(&self) -> ExecError {
        if self.deadline_hit.load(Ordering::Acquire) {
            ExecError::DeadlineExceeded
        } else {
            ExecError::Cancelled
        }
    }

    pub(crate) fn cycle_error(task: &Task) -> ExecError {
        ExecError::CycleDetected {
            task_id: task.id().clone(),
            name: task.name().to_string(),
        }
    }

    /// First reachable task (in id order) that never ran.
    ///
    /// After every branch has joined without error, such a task can only
    /// exist if its counter can never reach zero, i.e. it sits on a cycle.
    pub(crate) fn first_stalled(&self) -> Option<&Task> {
        self.pending
            .ids()
            .find(|id| !self.is_completed(id))
            .and_then(|id| self.graph.task(id))
    }
}
