// src/store/memory.rs

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::errors::StoreError;
use crate::model::{Workflow, WorkflowId};
use crate::store::WorkflowStore;

/// Process-local store guarded by a reader/writer lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workflows.read().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WorkflowStore for MemoryStore {
    fn create(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut guard = self.workflows.write().map_err(|_| StoreError::Poisoned)?;
        if guard.insert(workflow.id().clone(), workflow.clone()).is_some() {
            debug!(workflow_id = %workflow.id(), "replaced stored workflow");
        }
        Ok(())
    }

    fn get(&self, id: &WorkflowId) -> Result<Workflow, StoreError> {
        let guard = self.workflows.read().map_err(|_| StoreError::Poisoned)?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskSpec;
    use crate::types::TaskStatus;

    fn workflow(id: &str, name: &str) -> Workflow {
        let mut b = Workflow::builder(name).id(id);
        b.add_root(TaskSpec::log("a", "hi").with_id("a")).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn create_then_get_returns_a_copy() {
        let store = MemoryStore::new();
        let wf = workflow("wf-1", "first");
        store.create(&wf).unwrap();

        let fetched = store.get(wf.id()).unwrap();
        assert_eq!(fetched.name(), "first");

        fetched
            .task(&"a".into())
            .unwrap()
            .set_status(TaskStatus::Completed);
        let again = store.get(wf.id()).unwrap();
        assert_eq!(again.task(&"a".into()).unwrap().status(), TaskStatus::Pending);
    }

    #[test]
    fn create_overwrites_same_id() {
        let store = MemoryStore::new();
        store.create(&workflow("wf-1", "first")).unwrap();
        store.create(&workflow("wf-1", "second")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&"wf-1".into()).unwrap().name(), "second");
    }

    #[test]
    fn missing_id_is_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get(&"nope".into()).unwrap_err(),
            StoreError::NotFound("nope".into())
        );
    }
}
