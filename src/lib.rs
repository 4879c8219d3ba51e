// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod model;
pub mod store;
pub mod types;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigSection;
use crate::config::loader::load_and_validate;
use crate::engine::{DagExecutor, ExecutorOptions, ProgressRecord};
use crate::exec::{PayloadRunner, RetryingRunner};
use crate::model::{TaskId, Workflow};
use crate::store::{MemoryStore, WorkflowStore};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow file loading and validation
/// - the workflow store
/// - the executor and its runner stack
/// - the JSON-lines progress printer
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let workflow = cfg
        .build_workflow()
        .with_context(|| format!("failed to build workflow from {}", args.config.display()))?;

    if args.dry_run {
        print_dry_run(&cfg.config, &workflow);
        return Ok(());
    }

    let store = MemoryStore::new();
    store.create(&workflow)?;
    let mut workflow = store.get(workflow.id())?;

    let executor = build_executor(&cfg.config, args.retry || cfg.config.retry);

    // Ctrl-C → cancel the run.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; cancelling workflow");
            cancel.cancel();
        });
    }

    let (tx, rx) = mpsc::channel::<ProgressRecord>(cfg.config.sink_capacity);
    let printer = tokio::spawn(print_progress(rx));

    let result = executor.execute(&mut workflow, tx, &cancel).await;
    printer.await.context("progress printer stopped unexpectedly")??;

    let summary =
        result.with_context(|| format!("workflow '{}' did not complete", workflow.name()))?;
    info!(
        workflow_id = %workflow.id(),
        executed_tasks = summary.executed_tasks,
        total_tasks = summary.total_tasks,
        "done"
    );
    Ok(())
}

/// Runner stack and deadline from the `[config]` section.
pub fn build_executor(cfg: &ConfigSection, retry: bool) -> DagExecutor {
    let runner = PayloadRunner::new().with_log_delay(cfg.log_delay());
    let executor = if retry {
        DagExecutor::new(RetryingRunner::new(runner))
    } else {
        DagExecutor::new(runner)
    };
    executor.with_options(ExecutorOptions {
        timeout: cfg.timeout(),
    })
}

/// Print every record as one JSON line until the executor drops its sender.
async fn print_progress(mut rx: mpsc::Receiver<ProgressRecord>) -> Result<()> {
    while let Some(record) = rx.recv().await {
        let line = serde_json::to_string(&record).context("failed to encode progress record")?;
        println!("{line}");
    }
    Ok(())
}

/// Print tasks, edges, fan-in widths and a topological order without running anything.
fn print_dry_run(cfg: &ConfigSection, workflow: &Workflow) {
    let report = dag::analyze(workflow);
    let label = |id: &TaskId| {
        workflow
            .task(id)
            .map(|t| format!("{} ({})", t.name(), id))
            .unwrap_or_else(|| id.to_string())
    };

    println!("dagflow dry-run");
    println!("  workflow = {}", workflow);
    if !workflow.description().is_empty() {
        println!("  description = {}", workflow.description());
    }
    println!("  config.timeout_secs = {}", cfg.timeout_secs);
    println!("  config.retry = {}", cfg.retry);
    println!("  config.sink_capacity = {}", cfg.sink_capacity);
    println!();

    let roots: Vec<String> = workflow.graph().roots().iter().map(|id| label(id)).collect();
    println!("roots: {}", roots.join(", "));
    println!();

    println!("tasks ({}):", workflow.total_tasks());
    for (id, fan_in) in &report.fan_in {
        let Some(task) = workflow.task(id) else {
            continue;
        };
        println!("  - {}", label(id));
        println!("      type: {}", task.kind());
        println!("      fan_in: {fan_in}");
        if !task.next().is_empty() {
            let next: Vec<String> = task.next().iter().map(|n| label(n)).collect();
            println!("      next: {}", next.join(", "));
        }
        if task.retries() > 0 {
            println!("      retries: {} (delay {:?})", task.retries(), task.retry_delay());
        }
        if !task.condition().is_empty() {
            println!("      condition: {} (not evaluated)", task.condition());
        }
    }
    println!();

    match (&report.order, &report.cycle_at) {
        (Some(order), _) => {
            let order: Vec<String> = order.iter().map(|id| label(id)).collect();
            println!("order: {}", order.join(" -> "));
        }
        (None, Some(at)) => {
            println!("warning: cycle detected involving {}; execution will fail", label(at));
        }
        (None, None) => {}
    }

    debug!("dry-run complete (no execution)");
}
