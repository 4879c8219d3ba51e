// src/dag/mod.rs

//! Graph analysis over a workflow's task arena.
//!
//! - [`resolver`] computes the per-run pending-predecessor counters that gate
//!   fan-in tasks.
//! - [`graph`] builds a petgraph view of the workflow for dry-run reporting
//!   (topological order, fan-in widths, cycle warning).

pub mod graph;
pub mod resolver;

pub use graph::{GraphReport, analyze};
pub use resolver::{PendingDeps, resolve_pending_deps};
