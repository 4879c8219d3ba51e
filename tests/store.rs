mod common;

use dagflow::errors::StoreError;
use dagflow::exec::PayloadRunner;
use dagflow::model::WorkflowId;
use dagflow::store::{MemoryStore, WorkflowStore};
use dagflow::types::{TaskStatus, WorkflowStatus};
use dagflow_test_utils::builders::fan_in_workflow;

use common::{init_tracing, run_collecting};

#[tokio::test]
async fn fetched_workflows_execute_independently() {
    init_tracing();
    let store = MemoryStore::new();
    let wf = fan_in_workflow();
    store.create(&wf).unwrap();

    let mut first = store.get(wf.id()).unwrap();
    let mut second = store.get(wf.id()).unwrap();

    let (res, _) = run_collecting(&mut first, PayloadRunner::new()).await;
    assert_eq!(res.unwrap().executed_tasks, 5);
    assert_eq!(second.status(), WorkflowStatus::Idle);
    assert!(second.tasks().all(|t| t.status() == TaskStatus::Pending));

    let (res, _) = run_collecting(&mut second, PayloadRunner::new()).await;
    assert_eq!(res.unwrap().executed_tasks, 5);

    let stored = store.get(wf.id()).unwrap();
    assert_eq!(stored.status(), WorkflowStatus::Idle);
}

#[test]
fn unknown_id_is_not_found() {
    let store = MemoryStore::new();
    let id = WorkflowId::from("missing");
    assert_eq!(store.get(&id).unwrap_err(), StoreError::NotFound(id));
}
