// src/store/mod.rs

//! Workflow persistence.
//!
//! Only an in-memory store exists today; the trait is the seam for a
//! durable one.

pub mod memory;

pub use memory::MemoryStore;

use crate::errors::StoreError;
use crate::model::{Workflow, WorkflowId};

/// Keyed workflow storage.
///
/// `get` hands back an independent copy: executing it never mutates the
/// stored workflow.
pub trait WorkflowStore: Send + Sync {
    /// Store `workflow` under its id, replacing any previous entry.
    fn create(&self, workflow: &Workflow) -> Result<(), StoreError>;

    fn get(&self, id: &WorkflowId) -> Result<Workflow, StoreError>;
}
