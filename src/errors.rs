// src/errors.rs

//! Crate-wide error types.
//!
//! Construction problems, runner failures, executor failures and store
//! failures are kept in separate enums so callers can tell a rejected graph
//! apart from a failed run.

use std::time::Duration;

use thiserror::Error;

use crate::model::{TaskId, WorkflowId};
use crate::types::TaskKind;

/// Rejection raised while building tasks, payloads or workflows.
///
/// These are only ever produced at construction time, never during a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("name '{name}' is longer than {max} characters")]
    NameTooLong { name: String, max: usize },

    #[error("invalid task type: {0}")]
    InvalidType(TaskKind),

    #[error("retries must be at most {max} (got {got})")]
    RetriesOutOfRange { got: u32, max: u8 },

    #[error("retry delay must be at most {max:?} (got {got:?})")]
    DelayOutOfRange { got: Duration, max: Duration },

    #[error("payload cannot be empty")]
    NilPayload,

    #[error("payload type {payload} does not match task type {declared}")]
    PayloadTypeMismatch { declared: TaskKind, payload: TaskKind },

    #[error("task {task} has {got} successors (at most {max} allowed)")]
    TooManySuccessors { task: TaskId, got: usize, max: usize },

    #[error("workflow reaches {got} distinct tasks (at most {max} allowed)")]
    TooManyTotalTasks { got: usize, max: usize },

    #[error("workflow name '{name}' is longer than {max} characters")]
    WorkflowNameTooLong { name: String, max: usize },

    #[error("workflow description is longer than {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("workflow has no root tasks")]
    NoRootTasks,

    #[error("unknown task reference: {0}")]
    UnknownTask(TaskId),

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(TaskId),

    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("HTTP timeout must be at most {max:?} (got {got:?})")]
    TimeoutOutOfRange { got: Duration, max: Duration },

    #[error("invalid HTTP status code: {0} (expected 100..=599)")]
    StatusCodeOutOfRange(u16),

    #[error("invalid auth: {0}")]
    InvalidAuth(String),
}

/// Failure of a single task inside the task runner.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("invalid payload type for {declared} task (payload is {payload})")]
    PayloadMismatch { declared: TaskKind, payload: TaskKind },

    #[error("unknown task type: {0}")]
    UnknownType(TaskKind),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status: expected {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("task cancelled")]
    Cancelled,
}

impl TaskError {
    /// Errors that no amount of re-running can fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            TaskError::PayloadMismatch { .. } | TaskError::UnknownType(_) | TaskError::Cancelled
        )
    }
}

/// The result sink refused a progress record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("result sink closed")]
    Closed,
}

/// Failure of a whole workflow execution.
///
/// Only the first error discovered in a run is surfaced.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("cycle detected: task {task_id} (name: {name}) already executed in this workflow execution")]
    CycleDetected { task_id: TaskId, name: String },

    #[error("task {task_id} (name: {name}) failed: {source}")]
    Task {
        task_id: TaskId,
        name: String,
        #[source]
        source: TaskError,
    },

    #[error("workflow execution cancelled")]
    Cancelled,

    #[error("workflow execution exceeded its deadline")]
    DeadlineExceeded,

    #[error("failed to emit progress: {0}")]
    Sink(#[from] SinkError),

    #[error("branch task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("task {0} is not part of the workflow graph")]
    UnknownTask(TaskId),
}

impl ExecError {
    /// True for the context-style errors (cancellation or deadline), as
    /// opposed to failures caused by the graph or its tasks.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExecError::Cancelled | ExecError::DeadlineExceeded)
    }
}

/// Failure reported by a [`WorkflowStore`](crate::store::WorkflowStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("workflow with id {0} not found")]
    NotFound(WorkflowId),

    #[error("workflow store lock poisoned")]
    Poisoned,
}

/// Semantic problem in a workflow file, found after TOML parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config must contain at least one [task.<name>] section")]
    NoTasks,

    #[error("[config].{key} must be >= 1 (got {got})")]
    InvalidSetting { key: &'static str, got: u64 },

    #[error("task '{task}': {reason}")]
    InvalidTaskType { task: String, reason: String },

    #[error("task '{task}' has unknown successor '{reference}' in `next`")]
    UnknownSuccessor { task: String, reference: String },

    #[error("[workflow].roots names unknown task '{0}'")]
    UnknownRoot(String),

    #[error("no root tasks: every task has a parent, so [workflow].roots must be set")]
    NoRoots,

    #[error("task '{0}' is not reachable from any root")]
    Unreachable(String),

    #[error("task '{task}': {source}")]
    Task {
        task: String,
        #[source]
        source: ValidationError,
    },

    #[error("invalid workflow: {0}")]
    Workflow(#[from] ValidationError),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
