// src/model/workflow.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ValidationError;
use crate::model::task::{Task, TaskId, TaskSpec};
use crate::model::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_SUCCESSORS, MAX_TOTAL_TASKS};
use crate::types::WorkflowStatus;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn generate() -> Self {
        WorkflowId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkflowId {
    fn from(s: &str) -> Self {
        WorkflowId(s.to_string())
    }
}

impl From<String> for WorkflowId {
    fn from(s: String) -> Self {
        WorkflowId(s)
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arena of tasks keyed by id, plus the ordered root list.
///
/// Only tasks reachable from a root are stored.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: HashMap<TaskId, Task>,
    roots: Vec<TaskId>,
}

impl TaskGraph {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Root ids, in declaration order.
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// One-task graph that skips builder validation.
    #[cfg(test)]
    pub(crate) fn single(task: Task) -> Self {
        let id = task.id().clone();
        Self {
            tasks: HashMap::from([(id.clone(), task)]),
            roots: vec![id],
        }
    }
}

/// A validated workflow: metadata, run status and the task graph.
///
/// Cloning produces an independent instance: task status cells are copied,
/// not shared, so two clones can be executed separately.
#[derive(Debug)]
pub struct Workflow {
    id: WorkflowId,
    name: String,
    description: String,
    status: WorkflowStatus,
    graph: Arc<TaskGraph>,
}

impl Clone for Workflow {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            graph: Arc::new(TaskGraph::clone(&self.graph)),
        }
    }
}

impl Workflow {
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    #[cfg(test)]
    pub(crate) fn from_graph_unchecked(name: &str, graph: TaskGraph) -> Self {
        Self {
            id: WorkflowId::generate(),
            name: name.to_string(),
            description: String::new(),
            status: WorkflowStatus::Idle,
            graph: Arc::new(graph),
        }
    }

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }

    /// Root tasks (entry points), in declaration order.
    pub fn roots(&self) -> impl Iterator<Item = &Task> {
        self.graph
            .roots()
            .iter()
            .filter_map(|id| self.graph.task(id))
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.graph.task(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.tasks()
    }

    /// Number of distinct tasks reachable from the roots.
    pub fn total_tasks(&self) -> usize {
        self.graph.len()
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Shared handle to the graph for concurrently running branches.
    pub(crate) fn shared_graph(&self) -> Arc<TaskGraph> {
        Arc::clone(&self.graph)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id {}, Name {}", self.id, self.name)
    }
}

/// Assembles a [`Workflow`] and enforces every structural invariant in
/// [`build`](WorkflowBuilder::build).
///
/// Task-local rules are checked as each task is added; graph rules
/// (references, successor counts, total size) are checked at build time.
/// A build either returns a fully valid workflow or an error, never
/// something in between.
#[derive(Debug)]
pub struct WorkflowBuilder {
    id: Option<WorkflowId>,
    name: String,
    description: String,
    specs: HashMap<TaskId, TaskSpec>,
    roots: Vec<TaskId>,
    links: Vec<(TaskId, TaskId)>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            specs: HashMap::new(),
            roots: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<WorkflowId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate a task and add it to the arena, returning its id.
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<TaskId, ValidationError> {
        spec.validate()?;
        let id = spec.id.clone().unwrap_or_else(TaskId::generate);
        if self.specs.contains_key(&id) {
            return Err(ValidationError::DuplicateTaskId(id));
        }
        self.specs.insert(id.clone(), spec);
        Ok(id)
    }

    /// Add a task and mark it as a root.
    pub fn add_root(&mut self, spec: TaskSpec) -> Result<TaskId, ValidationError> {
        let id = self.add_task(spec)?;
        self.roots.push(id.clone());
        Ok(id)
    }

    /// Mark an already added task as a root.
    pub fn root(&mut self, id: &TaskId) -> &mut Self {
        self.roots.push(id.clone());
        self
    }

    /// Add an edge `from -> to` after both tasks exist.
    ///
    /// Edges are not checked for cycles; the executor detects those at
    /// run time.
    pub fn link(&mut self, from: &TaskId, to: &TaskId) -> &mut Self {
        self.links.push((from.clone(), to.clone()));
        self
    }

    pub fn build(self) -> Result<Workflow, ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::WorkflowNameTooLong {
                name: self.name,
                max: MAX_NAME_LEN,
            });
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::DescriptionTooLong {
                max: MAX_DESCRIPTION_LEN,
            });
        }

        let mut roots = Vec::new();
        let mut seen_roots = HashSet::new();
        for id in self.roots {
            if !self.specs.contains_key(&id) {
                return Err(ValidationError::UnknownTask(id));
            }
            if seen_roots.insert(id.clone()) {
                roots.push(id);
            }
        }
        if roots.is_empty() {
            return Err(ValidationError::NoRootTasks);
        }

        let mut tasks: HashMap<TaskId, Task> = HashMap::with_capacity(self.specs.len());
        for (id, spec) in self.specs {
            let task = Task::from_validated(id.clone(), spec)?;
            tasks.insert(id, task);
        }
        for (from, to) in self.links {
            if !tasks.contains_key(&to) {
                return Err(ValidationError::UnknownTask(to));
            }
            let task = tasks
                .get_mut(&from)
                .ok_or_else(|| ValidationError::UnknownTask(from.clone()))?;
            task.push_next(to);
        }

        for task in tasks.values() {
            if task.next().len() > MAX_SUCCESSORS {
                return Err(ValidationError::TooManySuccessors {
                    task: task.id().clone(),
                    got: task.next().len(),
                    max: MAX_SUCCESSORS,
                });
            }
            if let Some(missing) = task.next().iter().find(|n| !tasks.contains_key(*n)) {
                return Err(ValidationError::UnknownTask(missing.clone()));
            }
        }

        let reachable = reachable_from(&roots, &tasks);
        if reachable.len() > MAX_TOTAL_TASKS {
            return Err(ValidationError::TooManyTotalTasks {
                got: reachable.len(),
                max: MAX_TOTAL_TASKS,
            });
        }

        let before = tasks.len();
        tasks.retain(|id, _| reachable.contains(id));
        if tasks.len() < before {
            debug!(
                dropped = before - tasks.len(),
                "workflow builder: dropping tasks unreachable from any root"
            );
        }

        Ok(Workflow {
            id: self.id.unwrap_or_else(WorkflowId::generate),
            name: self.name,
            description: self.description,
            status: WorkflowStatus::Idle,
            graph: Arc::new(TaskGraph { tasks, roots }),
        })
    }
}

/// Distinct ids reachable from `roots`, deduplicated so re-converging paths
/// count once.
fn reachable_from(roots: &[TaskId], tasks: &HashMap<TaskId, Task>) -> HashSet<TaskId> {
    let mut visited = HashSet::new();
    let mut stack: Vec<&TaskId> = roots.iter().collect();
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(task) = tasks.get(id) {
            stack.extend(task.next().iter());
        }
    }
    visited
}
