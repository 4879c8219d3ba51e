#![allow(dead_code)]

use dagflow::engine::{DagExecutor, ExecutionSummary};
use dagflow::errors::ExecError;
use dagflow::exec::TaskRunner;
use dagflow::model::Workflow;
use dagflow_test_utils::sink::CollectingSink;
use tokio_util::sync::CancellationToken;

pub use dagflow_test_utils::{init_tracing, with_timeout};

/// Execute `workflow` with `runner`, collecting every progress record.
pub async fn run_collecting<R>(
    workflow: &mut Workflow,
    runner: R,
) -> (Result<ExecutionSummary, ExecError>, CollectingSink)
where
    R: TaskRunner + 'static,
{
    let sink = CollectingSink::new();
    let res = with_timeout(DagExecutor::new(runner).execute(
        workflow,
        sink.clone(),
        &CancellationToken::new(),
    ))
    .await;
    (res, sink)
}
