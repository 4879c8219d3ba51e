// src/dag/resolver.rs

//! Dependency resolver.
//!
//! Walks the graph once per execution and counts, for every reachable task,
//! how many parent edges point into it. The executor decrements these
//! counters as parents complete; whichever branch brings a counter to zero
//! launches the task.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};

use tracing::{trace, warn};

use crate::model::{TaskGraph, TaskId};

/// Pending-predecessor counters for one execution.
///
/// The key set is fixed after resolution; only counter values change, and
/// they change through atomic read-modify-write so concurrent branches never
/// need a lock.
#[derive(Debug, Default)]
pub struct PendingDeps {
    counters: BTreeMap<TaskId, AtomicI32>,
}

impl PendingDeps {
    /// Number of distinct tasks covered, i.e. the run's total task count.
    pub(crate) fn len(&self) -> usize {
        self.counters.len()
    }

    /// Current number of unsatisfied parent edges for `id`.
    pub fn get(&self, id: &TaskId) -> Option<i32> {
        self.counters.get(id).map(|c| c.load(Ordering::Acquire))
    }

    /// Atomically decrement and return the new value.
    ///
    /// Exactly one caller observes zero per task, however many parents race.
    pub fn decrement(&self, id: &TaskId) -> Option<i32> {
        self.counters
            .get(id)
            .map(|c| c.fetch_sub(1, Ordering::AcqRel) - 1)
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.counters.keys()
    }

    /// Plain copy of all counters.
    pub fn snapshot(&self) -> BTreeMap<TaskId, i32> {
        self.counters
            .iter()
            .map(|(id, c)| (id.clone(), c.load(Ordering::Acquire)))
            .collect()
    }

    fn ensure(&mut self, id: &TaskId) -> &AtomicI32 {
        self.counters
            .entry(id.clone())
            .or_insert_with(|| AtomicI32::new(0))
    }
}

/// Count pending predecessors for every task reachable from the roots.
///
/// Counters are incremented on edge discovery, while recursion into a task
/// happens at most once, so a counter ends up equal to the number of parent
/// edges (the fan-in width) even when paths re-converge.
pub fn resolve_pending_deps(graph: &TaskGraph) -> PendingDeps {
    let mut deps = PendingDeps::default();
    let mut visited = HashSet::new();

    for root in graph.roots() {
        traverse(graph, root, &mut deps, &mut visited);
    }

    trace!(counters = ?deps.snapshot(), "resolved pending dependencies");
    deps
}

fn traverse(
    graph: &TaskGraph,
    id: &TaskId,
    deps: &mut PendingDeps,
    visited: &mut HashSet<TaskId>,
) {
    if !visited.insert(id.clone()) {
        return;
    }
    deps.ensure(id);

    let Some(task) = graph.task(id) else {
        warn!(task = %id, "edge points at a task missing from the graph");
        return;
    };

    for next in task.next() {
        deps.ensure(next).fetch_add(1, Ordering::AcqRel);
        traverse(graph, next, deps, visited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskSpec, Workflow};

    fn log(name: &str) -> TaskSpec {
        TaskSpec::log(name, name).with_id(name)
    }

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    #[test]
    fn fan_in_width_is_counted_per_parent_edge() {
        let mut b = Workflow::builder("fan-in");
        b.add_task(log("e")).unwrap();
        b.add_task(log("d").next("e")).unwrap();
        for r in ["a", "b", "c"] {
            b.add_root(log(r).next("d")).unwrap();
        }
        let wf = b.build().unwrap();

        let deps = resolve_pending_deps(wf.graph());
        assert_eq!(deps.len(), 5);
        assert_eq!(deps.get(&id("a")), Some(0));
        assert_eq!(deps.get(&id("d")), Some(3));
        assert_eq!(deps.get(&id("e")), Some(1));
    }

    #[test]
    fn re_converging_paths_are_not_double_counted_as_nodes() {
        // a -> b -> d, a -> c -> d, d -> e
        let mut b = Workflow::builder("diamond");
        b.add_task(log("e")).unwrap();
        b.add_task(log("d").next("e")).unwrap();
        b.add_task(log("b").next("d")).unwrap();
        b.add_task(log("c").next("d")).unwrap();
        b.add_root(log("a").next("b").next("c")).unwrap();
        let wf = b.build().unwrap();

        let deps = resolve_pending_deps(wf.graph());
        assert_eq!(deps.len(), 5);
        assert_eq!(deps.get(&id("d")), Some(2));
        // e has a single parent edge even though two paths reach it.
        assert_eq!(deps.get(&id("e")), Some(1));
    }

    #[test]
    fn decrement_reaches_zero_exactly_once() {
        let mut b = Workflow::builder("pair");
        b.add_task(log("z")).unwrap();
        b.add_root(log("x").next("z")).unwrap();
        b.add_root(log("y").next("z")).unwrap();
        let wf = b.build().unwrap();
        let deps = resolve_pending_deps(wf.graph());

        assert_eq!(deps.decrement(&id("z")), Some(1));
        assert_eq!(deps.decrement(&id("z")), Some(0));
        assert_eq!(deps.decrement(&id("missing")), None);
    }

    #[test]
    fn cycles_terminate_and_count_back_edges() {
        let mut b = Workflow::builder("cycle");
        let a = b.add_root(log("a")).unwrap();
        let c = b.add_task(log("c")).unwrap();
        b.link(&a, &c).link(&c, &a);
        let wf = b.build().unwrap();

        let deps = resolve_pending_deps(wf.graph());
        assert_eq!(deps.len(), 2);
        assert_eq!(deps.get(&a), Some(1));
        assert_eq!(deps.get(&c), Some(1));
    }
}
