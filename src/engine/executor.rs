// src/engine/executor.rs

//! DAG executor.
//!
//! One tokio task per root branch. A branch runs its task, emits a progress
//! record, then decrements every successor's pending counter and spawns the
//! successors it brought to zero. A branch that reaches a task whose counter
//! is still positive simply stops: the last parent to finish launches it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::dag::resolve_pending_deps;
use crate::engine::context::RunContext;
use crate::engine::{ExecutionSummary, ProgressRecord, ResultSink};
use crate::errors::{ExecError, TaskError};
use crate::exec::TaskRunner;
use crate::model::{TaskId, Workflow};
use crate::types::WorkflowStatus;

/// Deadline applied to a run when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

type BranchFuture = Pin<Box<dyn Future<Output = Result<(), ExecError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Wall-clock budget for a whole run.
    pub timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Runs workflows with a shared [`TaskRunner`].
///
/// The executor itself is stateless between runs; every call to
/// [`execute`](DagExecutor::execute) builds fresh counters and a fresh
/// completed-set.
#[derive(Clone)]
pub struct DagExecutor {
    runner: Arc<dyn TaskRunner>,
    options: ExecutorOptions,
}

impl DagExecutor {
    pub fn new(runner: impl TaskRunner + 'static) -> Self {
        Self {
            runner: Arc::new(runner),
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ExecutorOptions {
        self.options
    }

    /// Execute every task reachable from the workflow's roots.
    ///
    /// Progress records go to `sink` as tasks complete; a summary record
    /// follows only on success. Cancelling `cancel` (or hitting the
    /// configured deadline) stops new task launches and interrupts in-flight
    /// waits. The first error observed is returned and the workflow is left
    /// in `Failed`.
    #[instrument(name = "workflow_execute", skip_all, fields(workflow_id = %workflow.id()))]
    pub async fn execute<S>(
        &self,
        workflow: &mut Workflow,
        sink: S,
        cancel: &CancellationToken,
    ) -> Result<ExecutionSummary, ExecError>
    where
        S: ResultSink + 'static,
    {
        let graph = workflow.shared_graph();
        let pending = resolve_pending_deps(&graph);

        let run_token = cancel.child_token();
        // Tears down the deadline watcher on every exit path.
        let _release = run_token.clone().drop_guard();

        let ctx = Arc::new(RunContext::new(
            Arc::clone(&graph),
            pending,
            run_token,
            Arc::clone(&self.runner),
            Arc::new(sink),
        ));

        workflow.set_status(WorkflowStatus::Running);
        info!(
            name = %workflow.name(),
            total_tasks = ctx.total(),
            roots = graph.roots().len(),
            "workflow_started"
        );

        spawn_deadline_watcher(Arc::clone(&ctx), self.options.timeout);

        let mut branches = JoinSet::new();
        for root in graph.roots() {
            branches.spawn(execute_chain(Arc::clone(&ctx), root.clone()));
        }

        let mut first_error = None;
        while let Some(joined) = branches.join_next().await {
            if let Err(err) = joined.map_err(ExecError::from).and_then(|res| res) {
                record_first(&ctx, &mut first_error, err);
            }
        }

        if first_error.is_none() {
            if let Some(stalled) = ctx.first_stalled() {
                warn!(task = %stalled.id(), name = %stalled.name(), "task never became ready");
                first_error = Some(RunContext::cycle_error(stalled));
            }
        }

        let executed = ctx.executed();
        if let Some(err) = first_error {
            workflow.set_status(WorkflowStatus::Failed);
            error!(
                executed_tasks = executed,
                total_tasks = ctx.total(),
                error = %err,
                "workflow_failed"
            );
            return Err(err);
        }

        workflow.set_status(WorkflowStatus::Completed);
        if let Err(err) = ctx
            .sink
            .emit(ProgressRecord::summary(
                WorkflowStatus::Completed,
                ctx.total(),
                executed,
            ))
            .await
        {
            workflow.set_status(WorkflowStatus::Failed);
            error!(error = %err, "workflow_failed");
            return Err(err.into());
        }

        info!(executed_tasks = executed, total_tasks = ctx.total(), "workflow_completed");
        Ok(ExecutionSummary {
            total_tasks: ctx.total(),
            executed_tasks: executed,
        })
    }
}

/// Keep the first error, cancel everything else.
fn record_first(ctx: &RunContext, slot: &mut Option<ExecError>, err: ExecError) {
    if slot.is_none() {
        ctx.cancel.cancel();
        *slot = Some(err);
    } else {
        debug!(error = %err, "dropping secondary branch error");
    }
}

fn spawn_deadline_watcher(ctx: Arc<RunContext>, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                ctx.deadline_hit.store(true, Ordering::Release);
                warn!(?timeout, "workflow deadline exceeded; cancelling run");
                ctx.cancel.cancel();
            }
            _ = ctx.cancel.cancelled() => {}
        }
    });
}

/// Run `id` and everything it unlocks.
fn execute_chain(ctx: Arc<RunContext>, id: TaskId) -> BranchFuture {
    Box::pin(async move {
        if ctx.cancel.is_cancelled() {
            return Err(ctx.cancellation_error());
        }

        let task = ctx
            .graph
            .task(&id)
            .ok_or_else(|| ExecError::UnknownTask(id.clone()))?;

        if ctx.is_completed(&id) {
            return Err(RunContext::cycle_error(task));
        }

        let remaining = ctx.pending.get(&id).unwrap_or(0);
        if remaining > 0 {
            debug!(task = %id, remaining, "waiting on other parents");
            return Ok(());
        }

        let output = ctx
            .runner
            .run(task, &ctx.cancel)
            .await
            .map_err(|source| match source {
                TaskError::Cancelled => ctx.cancellation_error(),
                source => ExecError::Task {
                    task_id: id.clone(),
                    name: task.name().to_string(),
                    source,
                },
            })?;

        if !ctx.mark_completed(&id) {
            return Err(RunContext::cycle_error(task));
        }
        let executed = ctx.bump_executed();
        info!(
            task = %id,
            name = %task.name(),
            executed_tasks = executed,
            total_tasks = ctx.total(),
            "task_completed"
        );

        ctx.sink
            .emit(ProgressRecord::task(
                task,
                output,
                ctx.workflow_status,
                ctx.total(),
                executed,
            ))
            .await?;

        let mut children = JoinSet::new();
        for next in task.next() {
            match ctx.pending.decrement(next) {
                Some(0) => {
                    debug!(parent = %id, task = %next, "all parents done; launching");
                    children.spawn(execute_chain(Arc::clone(&ctx), next.clone()));
                }
                Some(left) if left > 0 => {
                    debug!(parent = %id, task = %next, remaining = left, "successor still gated");
                }
                Some(left) => {
                    // Only reachable when a cycle feeds a task back into itself.
                    debug!(parent = %id, task = %next, remaining = left, "counter below zero");
                }
                None => return Err(ExecError::UnknownTask(next.clone())),
            }
        }

        let mut first_error = None;
        while let Some(joined) = children.join_next().await {
            if let Err(err) = joined.map_err(ExecError::from).and_then(|res| res) {
                record_first(&ctx, &mut first_error, err);
            }
        }
        first_error.map_or(Ok(()), Err)
    })
}
