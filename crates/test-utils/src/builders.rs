#![allow(dead_code)]

use dagflow::model::{TaskId, TaskSpec, Workflow, WorkflowBuilder};

/// Log task whose id and name are both `label`.
pub fn log_task(label: &str) -> TaskSpec {
    TaskSpec::log(label, format!("{label} executing")).with_id(label)
}

/// The canonical fan-in shape:
///
/// ```text
/// A ─┐
/// B ─┼─> D ─> E
/// C ─┘
/// ```
///
/// Ids are `task-a` .. `task-e`, names `Task A` .. `Task E`.
pub fn fan_in_workflow() -> Workflow {
    let mut b = Workflow::builder("Fan-In Test").description("3 root tasks -> 1 shared task");
    let e = b
        .add_task(TaskSpec::log("Task E", "Task E executing").with_id("task-e"))
        .expect("task E");
    let d = b
        .add_task(
            TaskSpec::log("Task D", "Task D executing (fan-in)")
                .with_id("task-d")
                .next(e),
        )
        .expect("task D");
    for letter in ["a", "b", "c"] {
        let upper = letter.to_uppercase();
        b.add_root(
            TaskSpec::log(format!("Task {upper}"), format!("Task {upper} executing"))
                .with_id(format!("task-{letter}"))
                .next(d.clone()),
        )
        .expect("root task");
    }
    b.build().expect("fan-in workflow is valid")
}

/// Builder preloaded with `count` log tasks named `t0..t{count-1}`, none of
/// them roots and none linked.
pub fn numbered_tasks(name: &str, count: usize) -> (WorkflowBuilder, Vec<TaskId>) {
    let mut b = Workflow::builder(name);
    let ids = (0..count)
        .map(|i| b.add_task(log_task(&format!("t{i}"))).expect("valid task"))
        .collect();
    (b, ids)
}
