// src/model/mod.rs

//! Task graph model.
//!
//! - [`task`] holds tasks, their ids and the unvalidated [`TaskSpec`] input.
//! - [`payload`] holds the closed set of payload kinds (log, HTTP) and HTTP auth.
//! - [`workflow`] holds the workflow, its task arena and the builder that
//!   enforces every structural invariant before a workflow exists.
//!
//! Edges are id lists into the arena; a task reachable from several parents
//! is stored once, which is what makes fan-in possible.

pub mod payload;
pub mod task;
pub mod workflow;

pub use payload::{HttpAuth, HttpPayload, HttpPayloadBuilder, LogPayload, Payload};
pub use task::{Task, TaskId, TaskSpec};
pub use workflow::{TaskGraph, Workflow, WorkflowBuilder, WorkflowId};

use std::time::Duration;

/// Longest task or workflow name, in characters.
pub const MAX_NAME_LEN: usize = 30;
/// Longest workflow description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Highest retry count a task may declare.
pub const MAX_RETRIES: u8 = 5;
/// Longest retry delay a task may declare.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Most successors a single task may point at.
pub const MAX_SUCCESSORS: usize = 3;
/// Most distinct tasks reachable from a workflow's roots.
pub const MAX_TOTAL_TASKS: usize = 10;
/// Longest per-request HTTP timeout.
pub const MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
