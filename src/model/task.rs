// src/model/task.rs

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::model::payload::Payload;
use crate::model::{MAX_NAME_LEN, MAX_RETRIES, MAX_RETRY_DELAY};
use crate::types::{TaskKind, TaskStatus};

/// Unique task identifier, assigned when the task is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        TaskId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated description of a task, as handed to the workflow builder.
///
/// Nothing here is checked until it goes through
/// [`WorkflowBuilder::add_task`](crate::model::WorkflowBuilder::add_task).
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Explicit id; a random one is generated when `None`.
    pub id: Option<TaskId>,
    pub name: String,
    pub kind: TaskKind,
    pub retries: u32,
    pub retry_delay: Duration,
    pub condition: String,
    pub payload: Option<Payload>,
    /// Successor ids, in launch order.
    pub next: Vec<TaskId>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            retries: 0,
            retry_delay: Duration::ZERO,
            condition: String::new(),
            payload: None,
            next: Vec::new(),
        }
    }

    /// A `LOG` task emitting `message`.
    pub fn log(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, TaskKind::Log).payload(Payload::log(message))
    }

    /// An `HTTP` task issuing the given request.
    pub fn http(name: impl Into<String>, payload: crate::model::HttpPayload) -> Self {
        Self::new(name, TaskKind::Http).payload(Payload::Http(payload))
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn next(mut self, id: impl Into<TaskId>) -> Self {
        self.next.push(id.into());
        self
    }

    /// Check every task-local invariant.
    ///
    /// Graph-level invariants (successor count, references, total size)
    /// are the builder's job.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                name: self.name.clone(),
                max: MAX_NAME_LEN,
            });
        }
        if self.kind == TaskKind::Unspecified {
            return Err(ValidationError::InvalidType(self.kind));
        }
        if self.retries > u32::from(MAX_RETRIES) {
            return Err(ValidationError::RetriesOutOfRange {
                got: self.retries,
                max: MAX_RETRIES,
            });
        }
        if self.retry_delay > MAX_RETRY_DELAY {
            return Err(ValidationError::DelayOutOfRange {
                got: self.retry_delay,
                max: MAX_RETRY_DELAY,
            });
        }
        let payload = self.payload.as_ref().ok_or(ValidationError::NilPayload)?;
        if payload.kind() != self.kind {
            return Err(ValidationError::PayloadTypeMismatch {
                declared: self.kind,
                payload: payload.kind(),
            });
        }
        Ok(())
    }
}

/// Lock-free status slot shared between the runner and progress reporting.
#[derive(Debug)]
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new(status: TaskStatus) -> Self {
        StatusCell(AtomicU8::new(status as u8))
    }

    fn load(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, status: TaskStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

impl Clone for StatusCell {
    fn clone(&self) -> Self {
        StatusCell::new(self.load())
    }
}

/// A validated task.
///
/// Everything except `status` is fixed at construction.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    name: String,
    kind: TaskKind,
    status: StatusCell,
    retries: u8,
    retry_delay: Duration,
    condition: String,
    payload: Payload,
    next: Vec<TaskId>,
}

impl Task {
    /// Build a task from a spec that already passed [`TaskSpec::validate`].
    pub(crate) fn from_validated(id: TaskId, spec: TaskSpec) -> Result<Self, ValidationError> {
        let payload = spec.payload.ok_or(ValidationError::NilPayload)?;
        let retries = u8::try_from(spec.retries).map_err(|_| ValidationError::RetriesOutOfRange {
            got: spec.retries,
            max: MAX_RETRIES,
        })?;

        Ok(Self {
            id,
            name: spec.name,
            kind: spec.kind,
            status: StatusCell::new(TaskStatus::Pending),
            retries,
            retry_delay: spec.retry_delay,
            condition: spec.condition,
            payload,
            next: spec.next,
        })
    }

    /// Build a task without any validation, for exercising runtime checks.
    #[cfg(test)]
    pub(crate) fn unchecked(id: &str, name: &str, kind: TaskKind, payload: Payload) -> Self {
        Self {
            id: TaskId::from(id),
            name: name.to_string(),
            kind,
            status: StatusCell::new(TaskStatus::Pending),
            retries: 0,
            retry_delay: Duration::ZERO,
            condition: String::new(),
            payload,
            next: Vec::new(),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn status(&self) -> TaskStatus {
        self.status.load()
    }

    /// Record a status transition. Intended for task runners only.
    pub fn set_status(&self, status: TaskStatus) {
        self.status.store(status);
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Guard expression carried for upstream-output evaluation.
    ///
    /// Not evaluated yet: every successor is treated as unconditional.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Successor ids, in declaration order.
    pub fn next(&self) -> &[TaskId] {
        &self.next
    }

    pub(crate) fn push_next(&mut self, id: TaskId) {
        self.next.push(id);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id {}, Name {}, Type {}", self.id, self.name, self.kind)
    }
}
