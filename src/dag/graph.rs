// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::model::{TaskId, Workflow};

/// Static view of a workflow's shape, used by `--dry-run`.
///
/// Cycles are not rejected when a workflow is built; this report only
/// surfaces them ahead of time. The executor is what actually fails a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphReport {
    /// Topological order of task ids, or `None` if the graph has a cycle.
    pub order: Option<Vec<TaskId>>,
    /// A task that sits on a cycle, when one exists.
    pub cycle_at: Option<TaskId>,
    /// Parent edge count per task.
    pub fan_in: BTreeMap<TaskId, usize>,
}

impl GraphReport {
    pub fn has_cycle(&self) -> bool {
        self.cycle_at.is_some()
    }
}

/// Build a petgraph view of the workflow and sort it.
///
/// Edge direction: parent -> successor.
pub fn analyze(workflow: &Workflow) -> GraphReport {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    let mut fan_in: BTreeMap<TaskId, usize> = BTreeMap::new();

    for task in workflow.tasks() {
        graph.add_node(task.id().as_str());
        fan_in.entry(task.id().clone()).or_insert(0);
    }

    for task in workflow.tasks() {
        for next in task.next() {
            graph.add_edge(task.id().as_str(), next.as_str(), ());
            *fan_in.entry(next.clone()).or_insert(0) += 1;
        }
    }

    match toposort(&graph, None) {
        Ok(order) => GraphReport {
            order: Some(order.into_iter().map(TaskId::from).collect()),
            cycle_at: None,
            fan_in,
        },
        Err(cycle) => GraphReport {
            order: None,
            cycle_at: Some(TaskId::from(cycle.node_id())),
            fan_in,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskSpec;

    #[test]
    fn orders_parents_before_children() {
        let mut b = Workflow::builder("chain");
        b.add_task(TaskSpec::log("c", "c").with_id("c")).unwrap();
        b.add_task(TaskSpec::log("b", "b").with_id("b").next("c")).unwrap();
        b.add_root(TaskSpec::log("a", "a").with_id("a").next("b").next("c"))
            .unwrap();
        let wf = b.build().unwrap();

        let report = analyze(&wf);
        assert!(!report.has_cycle());
        let order = report.order.expect("acyclic graph has an order");
        let pos = |s: &str| order.iter().position(|id| id.as_str() == s).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
        assert_eq!(report.fan_in.get(&TaskId::from("c")), Some(&2));
        assert_eq!(report.fan_in.get(&TaskId::from("a")), Some(&0));
    }

    #[test]
    fn reports_cycles() {
        let mut b = Workflow::builder("loop");
        let a = b.add_root(TaskSpec::log("a", "a").with_id("a")).unwrap();
        let c = b.add_task(TaskSpec::log("c", "c").with_id("c")).unwrap();
        b.link(&a, &c).link(&c, &a);
        let wf = b.build().unwrap();

        let report = analyze(&wf);
        assert!(report.has_cycle());
        assert!(report.order.is_none());
    }
}
